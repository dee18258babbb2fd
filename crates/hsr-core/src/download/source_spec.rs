//! Per-source endpoint layout and the parser seam.

use serde_json::Value;
use url::Url;

use crate::progress::{GameId, ItemKey, SeasonId, SourceKind};
use crate::retry::FetchError;

/// How a source discovers its items for a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enumeration {
    /// Fetch the season index (the schedule), parse game ids from it, and
    /// enumerate one item per game.
    FetchIndex,
    /// Work only on items the orchestrator has seeded into the tracker
    /// (per-game sources fed by the schedule).
    TrackerOnly,
    /// The season itself is the single item (standings pages).
    SeasonItem,
}

/// Endpoint layout for one source. `{season}` and `{game}` placeholders in
/// the templates are substituted at fetch time.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub source: SourceKind,
    pub enumeration: Enumeration,
    /// Archive the original response bytes alongside the parsed payload.
    pub archive_raw: bool,
    pub season_url: Option<String>,
    pub item_url: Option<String>,
    pub health_url: String,
}

impl SourceSpec {
    /// URL for an item key: the season template for season-level items, the
    /// item template for per-game items. Errors if the source has no
    /// endpoint at that level or the rendered URL is invalid.
    pub fn url_for(&self, key: &ItemKey) -> Result<String, FetchError> {
        let template = match key.game {
            None => self.season_url.as_deref(),
            Some(_) => self.item_url.as_deref(),
        };
        let template = template.ok_or_else(|| {
            FetchError::Internal(format!(
                "source {} has no endpoint for {}",
                self.source.as_str(),
                key
            ))
        })?;
        let rendered = render(template, key.season, key.game);
        // Validate early so a bad template fails the item, not the transfer.
        Url::parse(&rendered)
            .map_err(|e| FetchError::Internal(format!("invalid URL {}: {}", rendered, e)))?;
        Ok(rendered)
    }
}

fn render(template: &str, season: SeasonId, game: Option<GameId>) -> String {
    let mut out = template.replace("{season}", &season.to_string());
    if let Some(game) = game {
        out = out.replace("{game}", &game.to_string());
    }
    out
}

/// Parser boundary: turns one response body into the structured payload for
/// the source's feed, and extracts game ids from a season index payload.
/// Concrete report-variant parsers plug in here; the core ships a JSON
/// passthrough.
pub trait FeedParser: Send + Sync {
    fn parse(&self, body: &[u8]) -> Result<Value, FetchError>;

    /// Game ids from a season index payload. Only meaningful for sources
    /// with `Enumeration::FetchIndex`.
    fn parse_index(&self, payload: &Value) -> Result<Vec<GameId>, FetchError> {
        let _ = payload;
        Ok(Vec::new())
    }
}

/// Passthrough parser for JSON sources. The schedule index is read from a
/// top-level `games` array of objects with an `id` field.
#[derive(Debug, Default, Clone)]
pub struct JsonFeedParser;

impl FeedParser for JsonFeedParser {
    fn parse(&self, body: &[u8]) -> Result<Value, FetchError> {
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))
    }

    fn parse_index(&self, payload: &Value) -> Result<Vec<GameId>, FetchError> {
        let games = payload
            .get("games")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::Parse("schedule payload has no games array".into()))?;
        let mut ids = Vec::with_capacity(games.len());
        for game in games {
            let id = game
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| FetchError::Parse("schedule game missing id".into()))?;
            ids.push(id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> SourceSpec {
        SourceSpec {
            source: SourceKind::Api,
            enumeration: Enumeration::FetchIndex,
            archive_raw: false,
            season_url: Some("https://api.example.net/v1/schedule/{season}".into()),
            item_url: Some("https://api.example.net/v1/gamecenter/{game}/boxscore".into()),
            health_url: "https://api.example.net/v1/ping".into(),
        }
    }

    #[test]
    fn url_templates_substitute_placeholders() {
        let spec = spec();
        let season = ItemKey::season_item(SourceKind::Api, 20232024);
        assert_eq!(
            spec.url_for(&season).unwrap(),
            "https://api.example.net/v1/schedule/20232024"
        );
        let game = ItemKey::game_item(SourceKind::Api, 20232024, 2023020001);
        assert_eq!(
            spec.url_for(&game).unwrap(),
            "https://api.example.net/v1/gamecenter/2023020001/boxscore"
        );
    }

    #[test]
    fn missing_endpoint_level_is_an_error() {
        let mut spec = spec();
        spec.season_url = None;
        let season = ItemKey::season_item(SourceKind::Api, 20232024);
        assert!(spec.url_for(&season).is_err());
    }

    #[test]
    fn json_parser_reads_index_ids() {
        let parser = JsonFeedParser;
        let payload = parser
            .parse(br#"{"games": [{"id": 2023020001}, {"id": 2023020002}]}"#)
            .unwrap();
        let ids = parser.parse_index(&payload).unwrap();
        assert_eq!(ids, vec![2023020001, 2023020002]);

        let bad = json!({"matches": []});
        assert!(parser.parse_index(&bad).is_err());
        assert!(parser.parse(b"not json").is_err());
    }
}
