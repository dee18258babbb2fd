//! Item keys and the closed source/feed taxonomies.

/// Season identifier, year-pair encoded (e.g. 20232024).
pub type SeasonId = i64;

/// Game identifier as assigned by the official API.
pub type GameId = i64;

/// The download sources we poll. Stored as strings only at the persistence
/// boundary; in memory the set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// Official JSON API: season schedule plus per-game boxscores.
    Api,
    /// Stats REST API: per-game play-by-play event summaries.
    Events,
    /// Stats REST API: per-game shift charts.
    Shifts,
    /// Third-party standings pages (raw content archived).
    Standings,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Api,
        SourceKind::Events,
        SourceKind::Shifts,
        SourceKind::Standings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Api => "api",
            SourceKind::Events => "events",
            SourceKind::Shifts => "shifts",
            SourceKind::Standings => "standings",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "api" => Some(SourceKind::Api),
            "events" => Some(SourceKind::Events),
            "shifts" => Some(SourceKind::Shifts),
            "standings" => Some(SourceKind::Standings),
            _ => None,
        }
    }

    /// The feed a fetch from this source produces. The official API serves
    /// the season schedule at season level and boxscores at item level; the
    /// other sources serve a single feed.
    pub fn feed(self, item_level: bool) -> Feed {
        match (self, item_level) {
            (SourceKind::Api, false) => Feed::Schedule,
            (SourceKind::Api, true) => Feed::Boxscore,
            (SourceKind::Events, _) => Feed::PlayByPlay,
            (SourceKind::Shifts, _) => Feed::Shifts,
            (SourceKind::Standings, _) => Feed::Standings,
        }
    }
}

/// Logical dataset families as stored and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feed {
    Schedule,
    Boxscore,
    PlayByPlay,
    Shifts,
    Standings,
}

impl Feed {
    pub fn as_str(self) -> &'static str {
        match self {
            Feed::Schedule => "schedule",
            Feed::Boxscore => "boxscore",
            Feed::PlayByPlay => "play_by_play",
            Feed::Shifts => "shifts",
            Feed::Standings => "standings",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "schedule" => Some(Feed::Schedule),
            "boxscore" => Some(Feed::Boxscore),
            "play_by_play" => Some(Feed::PlayByPlay),
            "shifts" => Some(Feed::Shifts),
            "standings" => Some(Feed::Standings),
            _ => None,
        }
    }
}

/// Natural key of one unit of download work: a season-level item
/// (`game = None`) or one game from one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub source: SourceKind,
    pub season: SeasonId,
    pub game: Option<GameId>,
}

impl ItemKey {
    pub fn season_item(source: SourceKind, season: SeasonId) -> Self {
        Self {
            source,
            season,
            game: None,
        }
    }

    pub fn game_item(source: SourceKind, season: SeasonId, game: GameId) -> Self {
        Self {
            source,
            season,
            game: Some(game),
        }
    }

    pub fn is_item_level(&self) -> bool {
        self.game.is_some()
    }

    pub fn feed(&self) -> Feed {
        self.source.feed(self.is_item_level())
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.game {
            Some(game) => write!(f, "{}/{}/{}", self.source.as_str(), self.season, game),
            None => write!(f, "{}/{}", self.source.as_str(), self.season),
        }
    }
}
