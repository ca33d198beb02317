use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt;

pub type GameId = u32;
pub type TagId = u32;

/// A mechanic, theme, family or expansion link attached to a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

impl Tag {
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A ranked board game as stored in the search index.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Game {
    pub id: GameId,
    #[serde(default)]
    pub slug: String,
    pub name: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub brief_description: Option<String>,
    #[serde(default)]
    pub expected_playtime: u32,
    #[serde(default)]
    pub min_playtime: u32,
    #[serde(default)]
    pub max_playtime: u32,
    #[serde(default)]
    pub min_players: u32,
    #[serde(default)]
    pub max_players: u32,
    #[serde(default)]
    pub min_age: u32,
    pub rank: u32,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub num_ratings: u32,
    // unrated games carry no weight
    pub weight: Option<f64>,
    #[serde(default)]
    pub year_published: i32,
    #[serde(default)]
    pub categories: Vec<Tag>,
    #[serde(default)]
    pub mechanics: Vec<Tag>,
    #[serde(default)]
    pub families: Vec<Tag>,
    #[serde(default)]
    pub expansions: Vec<Tag>,
}

/// Tag dimension exposed as a filter facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Mechanics,
    Themes,
}

impl Facet {
    pub const ALL: [Facet; 2] = [Facet::Mechanics, Facet::Themes];

    /// Nested document path holding this facet's `{id, name}` pairs.
    pub fn path(self) -> &'static str {
        match self {
            Facet::Mechanics => "mechanics",
            Facet::Themes => "categories",
        }
    }

    pub fn tags(self, game: &Game) -> &[Tag] {
        match self {
            Facet::Mechanics => &game.mechanics,
            Facet::Themes => &game.categories,
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Mechanics => f.write_str("mechanics"),
            Facet::Themes => f.write_str("themes"),
        }
    }
}

/// Scalar document fields the read path filters, sorts or matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocField {
    Id,
    Name,
    Description,
    Rank,
    Rating,
    NumRatings,
    Weight,
    MinAge,
    ExpectedPlaytime,
    MinPlayers,
    MaxPlayers,
}

impl DocField {
    pub fn as_str(self) -> &'static str {
        match self {
            DocField::Id => "id",
            DocField::Name => "name",
            DocField::Description => "description",
            DocField::Rank => "rank",
            DocField::Rating => "rating",
            DocField::NumRatings => "num_ratings",
            DocField::Weight => "weight",
            DocField::MinAge => "min_age",
            DocField::ExpectedPlaytime => "expected_playtime",
            DocField::MinPlayers => "min_players",
            DocField::MaxPlayers => "max_players",
        }
    }

    /// Numeric value of this field on `game`, `None` when absent or textual.
    pub fn numeric(self, game: &Game) -> Option<f64> {
        match self {
            DocField::Id => Some(game.id as f64),
            DocField::Rank => Some(game.rank as f64),
            DocField::Rating => Some(game.rating),
            DocField::NumRatings => Some(game.num_ratings as f64),
            DocField::Weight => game.weight,
            DocField::MinAge => Some(game.min_age as f64),
            DocField::ExpectedPlaytime => Some(game.expected_playtime as f64),
            DocField::MinPlayers => Some(game.min_players as f64),
            DocField::MaxPlayers => Some(game.max_players as f64),
            DocField::Name | DocField::Description => None,
        }
    }

    pub fn text(self, game: &Game) -> Option<&str> {
        match self {
            DocField::Name => Some(&game.name),
            DocField::Description => game.description.as_deref(),
            _ => None,
        }
    }

    /// Whether sort values for this field are whole numbers.
    pub fn is_integral(self) -> bool {
        !matches!(
            self,
            DocField::Rating | DocField::Weight | DocField::Name | DocField::Description
        )
    }
}

/// Complete tag vocabulary for both facets, as served by `/api/tags`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagCatalog {
    pub mechanics: Vec<Tag>,
    pub themes: Vec<Tag>,
}

impl TagCatalog {
    pub fn get(&self, facet: Facet) -> &[Tag] {
        match facet {
            Facet::Mechanics => &self.mechanics,
            Facet::Themes => &self.themes,
        }
    }
}
