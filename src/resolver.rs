//! Download link resolution.
//!
//! Turning a track into a URL that its audio can be fetched from takes two
//! catalog round trips:
//!
//! 1. List the track's encodings and pick the one with the highest bitrate.
//! 2. Query the location data of that encoding.
//!
//! The location data is then signed into a time-bounded link:
//!
//! ```text
//! sign = hex(md5(SALT + path[1..] + s))
//! url  = https://{host}/get-mp3/{sign}/{ts}{path}
//! ```
//!
//! The construction has to match the download hosts' validation exactly.

use std::fmt;

use md5::{Digest, Md5};
use thiserror::Error;

use crate::{
    gateway::Catalog,
    protocol::gateway::{EncodingOption, Location, TrackId},
};

/// Shared secret mixed into every link signature.
pub const SIGN_SALT: &str = "XGRlBW9FXlekgbPrRHuSiA";

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to get download info: {0}")]
    Encodings(#[source] crate::error::Error),

    #[error("no download options available")]
    NoDownloadOptions,

    #[error("failed to get download link: {0}")]
    Location(#[source] crate::error::Error),
}

/// A signed download link.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedLink {
    pub host: String,
    pub path: String,
    pub sign: String,
    pub ts: String,
}

impl ResolvedLink {
    /// Signs the location data of an encoding.
    #[must_use]
    pub fn new(location: &Location) -> Self {
        Self {
            host: location.host.clone(),
            path: location.path.clone(),
            sign: sign(&location.path, &location.s),
            ts: location.ts.clone(),
        }
    }
}

impl fmt::Display for ResolvedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "https://{}/get-mp3/{}/{}{}",
            self.host, self.sign, self.ts, self.path
        )
    }
}

/// Computes the link signature for a file path and signing seed.
///
/// The first character of `path` is not signed.
#[must_use]
pub fn sign(path: &str, seed: &str) -> String {
    let mut chars = path.chars();
    chars.next();
    let stripped = chars.as_str();

    let mut hasher = Md5::new();
    hasher.update(SIGN_SALT);
    hasher.update(stripped);
    hasher.update(seed);
    format!("{:x}", hasher.finalize())
}

/// Picks the encoding with the highest bitrate.
///
/// Encodings without a location query URL are ignored. On a tie, the first
/// of the tied encodings is picked.
#[must_use]
pub fn pick_best(options: &[EncodingOption]) -> Option<&EncodingOption> {
    options
        .iter()
        .filter(|option| option.query_url.is_some())
        .reduce(|best, option| if option.bitrate > best.bitrate { option } else { best })
}

/// Resolves a signed download link for the track's best encoding.
///
/// # Errors
///
/// Returns [`Error::NoDownloadOptions`] when the track has no encoding with
/// a non-zero bitrate, and the underlying gateway error otherwise.
pub async fn resolve(catalog: &dyn Catalog, track_id: &TrackId) -> Result<ResolvedLink, Error> {
    let options = catalog
        .encodings(track_id)
        .await
        .map_err(Error::Encodings)?;

    let (best, query_url) = pick_best(&options)
        .filter(|option| option.bitrate > 0)
        .and_then(|option| Some((option, option.query_url.as_ref()?)))
        .ok_or(Error::NoDownloadOptions)?;
    debug!(
        "track {track_id}: picked {} kbps {} out of {} encodings",
        best.bitrate,
        best.codec,
        options.len()
    );

    let location = catalog
        .location(query_url)
        .await
        .map_err(Error::Location)?;

    Ok(ResolvedLink::new(&location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gateway::testing::FakeCatalog, protocol::gateway::Codec};

    fn option(bitrate: u32, n: u32) -> EncodingOption {
        EncodingOption {
            bitrate,
            codec: Codec::Mp3,
            query_url: Some(
                format!("https://storage.example/download-info/{n}")
                    .parse()
                    .unwrap(),
            ),
            direct: false,
            gain: false,
            preview: false,
        }
    }

    #[test]
    fn signature_vector() {
        let expected = format!("{:x}", Md5::digest("XGRlBW9FXlekgbPrRHuSiAabcs1"));
        assert_eq!(sign("/abc", "s1"), expected);
        assert_eq!(expected, "63714246e220cc24b1f4efcda8553e7c");
    }

    #[test]
    fn empty_path_signs_only_salt_and_seed() {
        assert_eq!(
            sign("", "s1"),
            format!("{:x}", Md5::digest("XGRlBW9FXlekgbPrRHuSiAs1"))
        );
    }

    #[test]
    fn final_url_keeps_original_path() {
        let link = ResolvedLink::new(&Location {
            host: "s1.storage.example".to_owned(),
            path: "/rmusic/U2Fs".to_owned(),
            ts: "0005f1b2".to_owned(),
            region: None,
            s: "deadbeef".to_owned(),
        });

        assert_eq!(
            link.to_string(),
            "https://s1.storage.example/get-mp3/9c603368d671abaacfe93cd9fac7c371/0005f1b2/rmusic/U2Fs"
        );
    }

    #[test]
    fn highest_bitrate_wins() {
        let options = [option(128, 1), option(320, 2), option(192, 3)];
        assert_eq!(pick_best(&options).unwrap().bitrate, 320);
        assert!(pick_best(&[]).is_none());
    }

    #[test]
    fn ties_pick_the_first() {
        let options = [option(192, 1), option(320, 2), option(320, 3)];
        assert_eq!(
            pick_best(&options).unwrap().query_url.as_ref().unwrap().as_str(),
            "https://storage.example/download-info/2"
        );
    }

    #[test]
    fn encodings_without_query_url_are_skipped() {
        let mut options = [option(320, 1), option(192, 2)];
        options[0].query_url = None;
        assert_eq!(pick_best(&options).unwrap().bitrate, 192);

        options[1].query_url = None;
        assert!(pick_best(&options).is_none());
    }

    #[tokio::test]
    async fn resolve_signs_location() {
        let catalog = FakeCatalog::default();
        let id: TrackId = "42".parse().unwrap();

        let link = resolve(&catalog, &id).await.unwrap();
        assert_eq!(link.host, FakeCatalog::HOST);
        assert_eq!(link.path, "/rmusic/42");
        assert_eq!(link.sign, sign("/rmusic/42", FakeCatalog::SEED));
        assert_eq!(catalog.calls(), 2);
    }

    #[tokio::test]
    async fn zero_bitrate_is_no_option() {
        let catalog = FakeCatalog::default().with_bitrate("7", 0);
        let err = resolve(&catalog, &"7".parse().unwrap()).await.unwrap_err();

        assert!(matches!(err, Error::NoDownloadOptions));
        assert_eq!(err.to_string(), "no download options available");
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn no_encodings_is_no_option() {
        let catalog = FakeCatalog::default().without_encodings("7");
        let err = resolve(&catalog, &"7".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::NoDownloadOptions));
    }

    #[tokio::test]
    async fn gateway_failures_keep_their_cause() {
        let catalog = FakeCatalog::default().failing_encodings("7");
        let err = resolve(&catalog, &"7".parse().unwrap()).await.unwrap_err();

        assert!(err.to_string().starts_with("failed to get download info: "));
        assert!(std::error::Error::source(&err).is_some());
    }
}
