//! Structured filter state and the closed range-bucket families.
//!
//! Every bucket family is a plain enum whose variants map exhaustively to a
//! conjunction of numeric ranges. Selecting several buckets of one family
//! means "any of them"; families combine with AND.

use crate::model::{DocField, Facet, TagId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive/exclusive bounds on one numeric document field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    pub field: DocField,
    pub gte: Option<f64>,
    pub gt: Option<f64>,
    pub lte: Option<f64>,
    pub lt: Option<f64>,
}

impl FieldRange {
    pub fn on(field: DocField) -> Self {
        Self {
            field,
            gte: None,
            gt: None,
            lte: None,
            lt: None,
        }
    }

    pub fn gte(mut self, v: f64) -> Self {
        self.gte = Some(v);
        self
    }

    pub fn gt(mut self, v: f64) -> Self {
        self.gt = Some(v);
        self
    }

    pub fn lte(mut self, v: f64) -> Self {
        self.lte = Some(v);
        self
    }

    pub fn lt(mut self, v: f64) -> Self {
        self.lt = Some(v);
        self
    }

    pub fn contains(&self, v: f64) -> bool {
        self.gte.map_or(true, |b| v >= b)
            && self.gt.map_or(true, |b| v > b)
            && self.lte.map_or(true, |b| v <= b)
            && self.lt.map_or(true, |b| v < b)
    }
}

/// A named, fixed range predicate offered as one filter choice.
pub trait Bucket: Copy + Ord + Sized + 'static {
    const ALL: &'static [Self];

    /// Stable URL tag for this bucket.
    fn tag(self) -> &'static str;

    /// Conjunction of ranges a document must satisfy to fall in this bucket.
    fn predicate(self) -> Vec<FieldRange>;

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.tag() == tag)
    }
}

macro_rules! buckets {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal : $pred:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Bucket for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn tag(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            fn predicate(self) -> Vec<FieldRange> {
                match self {
                    $($name::$variant => $pred),+
                }
            }
        }
    };
}

fn on(field: DocField) -> FieldRange {
    FieldRange::on(field)
}

fn seats(n: f64) -> Vec<FieldRange> {
    vec![
        on(DocField::MinPlayers).lte(n),
        on(DocField::MaxPlayers).gte(n),
    ]
}

buckets!(
    /// Overall catalog rank (1 is best).
    RankBucket {
        Top100 => "1-100": vec![on(DocField::Rank).gte(1.0).lte(100.0)],
        Top500 => "101-500": vec![on(DocField::Rank).gte(101.0).lte(500.0)],
        Top1000 => "501-1000": vec![on(DocField::Rank).gte(501.0).lte(1000.0)],
        Top5000 => "1001-5000": vec![on(DocField::Rank).gte(1001.0).lte(5000.0)],
        Rest => "5001+": vec![on(DocField::Rank).gte(5001.0)],
    }
);

buckets!(
    /// Average user rating on a 1–10 scale.
    RatingBucket {
        Excellent => "9+": vec![on(DocField::Rating).gte(9.0)],
        Great => "8-9": vec![on(DocField::Rating).gte(8.0).lt(9.0)],
        Good => "7-8": vec![on(DocField::Rating).gte(7.0).lt(8.0)],
        Fair => "6-7": vec![on(DocField::Rating).gte(6.0).lt(7.0)],
        Poor => "0-6": vec![on(DocField::Rating).lt(6.0)],
    }
);

buckets!(
    /// Number of user ratings.
    RatingCountBucket {
        Huge => "10000+": vec![on(DocField::NumRatings).gte(10_000.0)],
        Large => "1000-10000": vec![on(DocField::NumRatings).gte(1_000.0).lt(10_000.0)],
        Medium => "100-1000": vec![on(DocField::NumRatings).gte(100.0).lt(1_000.0)],
        Small => "0-100": vec![on(DocField::NumRatings).lt(100.0)],
    }
);

buckets!(
    /// Complexity weight on a 1–5 scale. Unweighted games match no bucket.
    WeightBucket {
        Light => "1-2": vec![on(DocField::Weight).gte(1.0).lt(2.0)],
        MediumLight => "2-3": vec![on(DocField::Weight).gte(2.0).lt(3.0)],
        MediumHeavy => "3-4": vec![on(DocField::Weight).gte(3.0).lt(4.0)],
        Heavy => "4-5": vec![on(DocField::Weight).gte(4.0).lte(5.0)],
    }
);

buckets!(
    /// Publisher's minimum recommended age.
    AgeBucket {
        Toddler => "0-5": vec![on(DocField::MinAge).lt(5.0)],
        Child => "5-10": vec![on(DocField::MinAge).gte(5.0).lt(10.0)],
        Teen => "10-14": vec![on(DocField::MinAge).gte(10.0).lt(14.0)],
        Adult => "14+": vec![on(DocField::MinAge).gte(14.0)],
    }
);

buckets!(
    /// Expected playing time in minutes.
    PlaytimeBucket {
        Quick => "0-30": vec![on(DocField::ExpectedPlaytime).lte(30.0)],
        Short => "30-60": vec![on(DocField::ExpectedPlaytime).gt(30.0).lte(60.0)],
        Long => "60-120": vec![on(DocField::ExpectedPlaytime).gt(60.0).lte(120.0)],
        Epic => "120+": vec![on(DocField::ExpectedPlaytime).gt(120.0)],
    }
);

buckets!(
    /// Supported player count.
    PlayersBucket {
        One => "1": seats(1.0),
        Two => "2": seats(2.0),
        Three => "3": seats(3.0),
        Four => "4": seats(4.0),
        Five => "5": seats(5.0),
        Six => "6": seats(6.0),
        Seven => "7": seats(7.0),
        EightPlus => "8+": vec![on(DocField::MaxPlayers).gte(8.0)],
    }
);

/// Primary ordering requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Relevance,
    Rank,
    Rating,
    Weight,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Relevance,
        SortKey::Rank,
        SortKey::Rating,
        SortKey::Weight,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            SortKey::Relevance => "relevance",
            SortKey::Rank => "rank",
            SortKey::Rating => "rating",
            SortKey::Weight => "weight",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// Document field backing this key; `None` for relevance.
    pub fn field(self) -> Option<DocField> {
        match self {
            SortKey::Relevance => None,
            SortKey::Rank => Some(DocField::Rank),
            SortKey::Rating => Some(DocField::Rating),
            SortKey::Weight => Some(DocField::Weight),
        }
    }
}

/// The complete client filter state. `Default` is the inactive state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSet {
    pub keywords: String,
    pub sort: SortKey,
    pub reverse: bool,
    pub rank: BTreeSet<RankBucket>,
    pub rating: BTreeSet<RatingBucket>,
    pub rating_count: BTreeSet<RatingCountBucket>,
    pub weight: BTreeSet<WeightBucket>,
    pub age: BTreeSet<AgeBucket>,
    pub playtime: BTreeSet<PlaytimeBucket>,
    pub players: BTreeSet<PlayersBucket>,
    pub mechanics: BTreeSet<TagId>,
    pub themes: BTreeSet<TagId>,
}

impl FilterSet {
    pub fn is_default(&self) -> bool {
        *self == FilterSet::default()
    }

    /// Trimmed keyword text, `None` when no keyword search is active.
    pub fn keywords(&self) -> Option<&str> {
        let trimmed = self.keywords.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn tags(&self, facet: Facet) -> &BTreeSet<TagId> {
        match facet {
            Facet::Mechanics => &self.mechanics,
            Facet::Themes => &self.themes,
        }
    }

    /// Predicates of every active bucket family, one OR-group per family.
    pub fn bucket_groups(&self) -> Vec<Vec<Vec<FieldRange>>> {
        fn group<B: Bucket>(set: &BTreeSet<B>) -> Vec<Vec<FieldRange>> {
            set.iter().map(|b| b.predicate()).collect()
        }
        [
            group(&self.rank),
            group(&self.rating),
            group(&self.rating_count),
            group(&self.weight),
            group(&self.age),
            group(&self.playtime),
            group(&self.players),
        ]
        .into_iter()
        .filter(|g| !g.is_empty())
        .collect()
    }
}
