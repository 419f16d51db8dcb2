//! Episode identity extraction from release-style filenames.
//!
//! Patterns are tried most specific first; the first match wins, so an
//! explicit `Title - S01E02 - Episode Title` is never shadowed by the bare
//! `S01E02` form.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::EpisodeIdentity;

/// Release tags that end an episode title (`... - Pilot 1080p WEB-DL`).
const QUALITY_TOKENS: &[&str] = &[
    "2160p", "1080p", "720p", "576p", "480p", "4k", "bluray", "blu-ray", "brrip", "bdrip", "web-dl",
    "webdl", "webrip", "hdtv", "dvdrip", "hdrip", "x264", "x265", "h264", "h265", "hevc", "xvid",
];

/// Tags that are also ordinary words ("The Web of Lies"). They only end a
/// title when nothing but release tags follows them.
const TRAILING_ONLY_TOKENS: &[&str] = &["web", "dvd", "proper", "repack"];

/// Extensions stripped before matching so they never leak into a title.
const MEDIA_EXTENSIONS: &[&str] = &["srt", "sub", "ass", "ssa", "vtt", "mkv", "mp4", "avi", "m4v", "mov", "webm"];

fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)(?P<title>.*?)\s*-\s*S(?P<season>\d+)E(?P<episode>\d+)\s*-\s*(?P<ep_title>.*)",
            r"(?i)(?P<title>.*?)\s*S(?P<season>\d+)E(?P<episode>\d+)",
            r"(?i)(?P<title>.*?)\s*(?P<season>\d+)x(?P<episode>\d+)",
            r"(?i)(?P<title>.*?)\s*Season\s*(?P<season>\d+)\s*Episode\s*(?P<episode>\d+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid identity pattern"))
        .collect()
    })
}

/// Parses a filename into an [`EpisodeIdentity`], or `None` when no pattern
/// matches. Callers fall back to the file stem as display title.
pub fn parse(filename: &str) -> Option<EpisodeIdentity> {
    let clean = strip_media_extension(filename).replace(['.', '_'], " ");
    for pattern in patterns() {
        let Some(caps) = pattern.captures(&clean) else { continue };
        let (Some(season), Some(episode)) = (
            caps.name("season").and_then(|m| m.as_str().parse().ok()),
            caps.name("episode").and_then(|m| m.as_str().parse().ok()),
        ) else {
            continue;
        };
        let series_title = trim_separators(caps.name("title").map_or("", |m| m.as_str())).to_string();
        let episode_title = caps
            .name("ep_title")
            .map(|m| trim_separators(truncate_at_quality(m.as_str())).to_string())
            .filter(|t| !t.is_empty());
        return Some(EpisodeIdentity { series_title, season, episode, episode_title });
    }
    None
}

fn strip_media_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if MEDIA_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)) => stem,
        _ => filename,
    }
}

/// Cuts the text at the earliest quality token that stands as its own word.
fn truncate_at_quality(text: &str) -> &str {
    let lower = text.to_ascii_lowercase();
    let mut cut = text.len();
    for (token, trailing_only) in QUALITY_TOKENS
        .iter()
        .map(|t| (t, false))
        .chain(TRAILING_ONLY_TOKENS.iter().map(|t| (t, true)))
    {
        let mut from = 0;
        while let Some(pos) = lower[from..].find(token) {
            let start = from + pos;
            let end = start + token.len();
            if is_word_boundary(&lower, start, end) && (!trailing_only || only_tags_follow(&lower[end..])) {
                cut = cut.min(start);
                break;
            }
            from = end;
        }
    }
    &text[..cut]
}

fn only_tags_follow(rest: &str) -> bool {
    rest.split(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')'))
        .map(|w| w.trim_matches('-'))
        .filter(|w| !w.is_empty())
        .all(|w| QUALITY_TOKENS.contains(&w) || TRAILING_ONLY_TOKENS.contains(&w))
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back().map_or(true, |c| !c.is_alphanumeric());
    let after = text[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
    before && after
}

fn trim_separators(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '[' | ']' | '(' | ')'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(title: &str, season: u32, episode: u32, ep_title: Option<&str>) -> EpisodeIdentity {
        EpisodeIdentity {
            series_title: title.into(),
            season,
            episode,
            episode_title: ep_title.map(str::to_string),
        }
    }

    #[test]
    fn dotted_release_name() {
        assert_eq!(parse("Breaking.Bad.S01E02.1080p.mkv"), Some(identity("Breaking Bad", 1, 2, None)));
    }

    #[test]
    fn explicit_episode_title_wins_over_bare_tag() {
        assert_eq!(
            parse("The Office - S03E01 - Gay Witch Hunt - Bluray"),
            Some(identity("The Office", 3, 1, Some("Gay Witch Hunt")))
        );
    }

    #[test]
    fn episode_title_stripped_of_extension_and_quality() {
        assert_eq!(
            parse("Friends - S01E05 - The One with the East German Laundry Detergent 720p WEB-DL.srt"),
            Some(identity("Friends", 1, 5, Some("The One with the East German Laundry Detergent")))
        );
    }

    #[test]
    fn episode_title_reduced_to_nothing_is_absent() {
        assert_eq!(parse("Lost - S02E03 - 1080p"), Some(identity("Lost", 2, 3, None)));
    }

    #[test]
    fn underscores_and_lowercase_tag() {
        assert_eq!(parse("the_wire_s04e13.srt"), Some(identity("the wire", 4, 13, None)));
    }

    #[test]
    fn cross_notation() {
        assert_eq!(parse("Seinfeld 3x07.srt"), Some(identity("Seinfeld", 3, 7, None)));
    }

    #[test]
    fn spelled_out_season_episode() {
        assert_eq!(parse("Frasier Season 2 Episode 11.srt"), Some(identity("Frasier", 2, 11, None)));
    }

    #[test]
    fn no_pattern_means_no_identity() {
        assert_eq!(parse("Heat.srt"), None);
        assert_eq!(parse("The.Godfather.1972.srt"), None);
    }

    #[test]
    fn everyday_words_in_episode_titles_are_kept() {
        assert_eq!(
            parse("Show - S01E01 - The Web of Lies.srt"),
            Some(identity("Show", 1, 1, Some("The Web of Lies")))
        );
        assert_eq!(
            parse("Show - S02E04 - A Proper Gentleman.srt"),
            Some(identity("Show", 2, 4, Some("A Proper Gentleman")))
        );
        assert_eq!(
            parse("Show - S03E01 - The DVD Player.srt"),
            Some(identity("Show", 3, 1, Some("The DVD Player")))
        );
        assert_eq!(
            parse("Show - S03E02 - The Repack Job.srt"),
            Some(identity("Show", 3, 2, Some("The Repack Job")))
        );
    }

    #[test]
    fn trailing_release_words_are_still_cut() {
        assert_eq!(parse("Show - S01E02 - Pilot WEB.srt"), Some(identity("Show", 1, 2, Some("Pilot"))));
        assert_eq!(
            parse("Show - S01E03 - Pilot PROPER 720p WEB-DL.srt"),
            Some(identity("Show", 1, 3, Some("Pilot")))
        );
        assert_eq!(parse("Show - S01E04 - Pilot DVD [x264].srt"), Some(identity("Show", 1, 4, Some("Pilot"))));
    }

    #[test]
    fn quality_token_inside_word_is_kept() {
        // "web" inside "Webster" must not cut the title.
        assert_eq!(
            parse("Show - S01E01 - Webster Returns.srt"),
            Some(identity("Show", 1, 1, Some("Webster Returns")))
        );
    }
}
