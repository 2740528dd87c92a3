//! Invite links: the token rides in the `g` query parameter.

use santa_core::TOKEN_PARAM;
use serde::Serialize;
use url::Url;

/// What a pasted or opened link asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mode {
    Create,
    Join { token: String },
}

/// `base` with its `g` parameter set to `token`; other parameters are kept.
pub fn invite_link(base: &str, token: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != TOKEN_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(TOKEN_PARAM, token);
    Ok(url)
}

/// An empty `g` counts as absent.
pub fn mode_for(link: &Url) -> Mode {
    link.query_pairs()
        .find(|(key, value)| key == TOKEN_PARAM && !value.is_empty())
        .map(|(_, token)| Mode::Join {
            token: token.into_owned(),
        })
        .unwrap_or(Mode::Create)
}
