use reqwest::Url;

/// Chat platform delivery.
pub mod chat;
/// External game host reports.
pub mod game_host;

/// Append `segments` to `base`, percent-encoding each one as a single path segment.
///
/// `base` is expected to be an absolute URL (configuration rejects anything else);
/// otherwise the segments are joined verbatim.
pub fn join_segments<'a, I>(base: &str, segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let segments: Vec<&str> = segments.into_iter().collect();
    if let Ok(mut url) = Url::parse(base) {
        let appended = url
            .path_segments_mut()
            .map(|mut path| {
                path.pop_if_empty().extend(&segments);
            })
            .is_ok();
        if appended {
            return url.into();
        }
    }
    let mut joined = base.trim_end_matches('/').to_owned();
    for segment in segments {
        joined.push('/');
        joined.push_str(segment);
    }
    joined
}
