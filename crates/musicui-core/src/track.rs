//! Catalog records as delivered by the content API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque track identifier. The API hands out integers for some collections
/// and UUID strings for others, so both are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => TrackId(s),
            RawId::Int(n) => TrackId(n.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    /// Asset identifier, resolved against the configured asset base.
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    /// Playable media URL.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub top_track: bool,
}

impl Track {
    pub fn cover_url(&self, asset_base: &str) -> Option<String> {
        let cover = self.cover.as_deref().filter(|c| !c.is_empty())?;
        Some(format!("{}/{}", asset_base.trim_end_matches('/'), cover))
    }

    /// Creation date in the local timezone, `YYYY-MM-DD`.
    pub fn created_label(&self) -> Option<String> {
        self.date_created
            .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d").to_string())
    }
}

/// The tracks currently loaded from the catalog, in server order.
///
/// Replaced wholesale whenever a query result is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    tracks: Vec<Track>,
}

impl ResultSet {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Track> {
        self.tracks.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn as_slice(&self) -> &[Track] {
        &self.tracks
    }

    pub fn position(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == id)
    }

    pub fn find(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    /// `ceil(len / page_size)`; zero for an empty set.
    pub fn page_count(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.tracks.len().div_ceil(page_size)
    }
}

impl From<Vec<Track>> for ResultSet {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}

/// Envelope of every collection read: `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
pub struct CatalogResponse {
    pub data: Vec<Track>,
}

#[cfg(test)]
pub(crate) fn sample_track(id: &str) -> Track {
    Track {
        id: TrackId::from(id),
        name: format!("Song {}", id),
        artist: format!("Artist {}", id),
        cover: Some(format!("cover-{}", id)),
        date_created: None,
        url: format!("https://cdn.example.com/{}.mp3", id),
        top_track: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r##"{
        "data": [
            {
                "id": 1,
                "status": "published",
                "sort": null,
                "user_created": "2085be13-8079-40a6-8a39-c3b4be9e4c1e",
                "date_created": "2023-08-10T06:10:57.746Z",
                "date_updated": null,
                "name": "Colors",
                "artist": "William King",
                "accent": "#331E00",
                "cover": "4f718272-6b0e-42ee-92d0-805b783cb471",
                "top_track": true,
                "url": "https://pub-172b4845a7e24a16956308706aaf24c2.r2.dev/august-145937.mp3"
            },
            {
                "id": "b7c2",
                "name": "Night Drive",
                "artist": "Kaen",
                "cover": null,
                "url": "https://cdn.example.com/night.mp3"
            }
        ]
    }"##;

    #[test]
    fn test_decode_catalog_body() {
        let resp: CatalogResponse = serde_json::from_str(BODY).unwrap();
        assert_eq!(resp.data.len(), 2);

        let first = &resp.data[0];
        assert_eq!(first.id, TrackId::from("1"));
        assert_eq!(first.name, "Colors");
        assert!(first.top_track);
        assert!(first.date_created.is_some());

        let second = &resp.data[1];
        assert_eq!(second.id.as_str(), "b7c2");
        assert!(!second.top_track);
        assert!(second.cover.is_none());
        assert!(second.date_created.is_none());
    }

    #[test]
    fn test_cover_url() {
        let t = sample_track("a");
        assert_eq!(
            t.cover_url("https://cms.example.com/assets/").as_deref(),
            Some("https://cms.example.com/assets/cover-a")
        );
        let bare = Track { cover: None, ..t };
        assert!(bare.cover_url("https://cms.example.com/assets").is_none());
    }

    #[test]
    fn test_page_count() {
        let set: ResultSet = (0..21).map(|i| sample_track(&i.to_string())).collect::<Vec<_>>().into();
        assert_eq!(set.page_count(10), 3);
        assert_eq!(ResultSet::default().page_count(10), 0);
        let ten: ResultSet = (0..10).map(|i| sample_track(&i.to_string())).collect::<Vec<_>>().into();
        assert_eq!(ten.page_count(10), 1);
    }

    #[test]
    fn test_position_follows_server_order() {
        let set = ResultSet::new(vec![sample_track("a"), sample_track("b"), sample_track("c")]);
        assert_eq!(set.position(&TrackId::from("c")), Some(2));
        assert_eq!(set.position(&TrackId::from("z")), None);
        assert_eq!(set.find(&TrackId::from("b")).map(|t| t.name.as_str()), Some("Song b"));
    }
}
