//! Compiles a [`FilterSet`] into an engine-neutral [`StructuredQuery`].
//!
//! Three clause groups are produced:
//! - `filter`: non-scoring; one OR-group per active bucket family, ANDed.
//! - `should`: scoring only; one clause per selected mechanic/theme id.
//! - `must`: the keyword match, when keywords are present.
//!
//! The sort always ends in the unique `id` field so every page boundary is a
//! strict keyset position.

use crate::cursor::{self, Cursor, CursorSlot};
use crate::filter::{FieldRange, FilterSet, SortKey};
use crate::model::{DocField, Facet, TagId};
use serde_json::{json, Value as JsonValue};

/// Keyword match targets and their boosts.
pub const KEYWORD_FIELDS: [(DocField, f32); 2] =
    [(DocField::Name, 10.0), (DocField::Description, 1.0)];

/// Field used to keep unranked-by-text results in a meaningful order.
pub const POPULARITY_FIELD: DocField = DocField::Rank;
/// Unique total-order tie-breaker.
pub const ID_FIELD: DocField = DocField::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn flip(self) -> Self {
        match self {
            Order::Asc => Order::Desc,
            Order::Desc => Order::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortTarget {
    Score,
    Field(DocField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    pub target: SortTarget,
    pub order: Order,
    /// Documents lacking the field sort after all others in either direction.
    pub missing_last: bool,
}

impl SortField {
    fn score(order: Order) -> Self {
        Self {
            target: SortTarget::Score,
            order,
            missing_last: false,
        }
    }

    fn field(field: DocField, order: Order) -> Self {
        Self {
            target: SortTarget::Field(field),
            order,
            missing_last: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub fields: Vec<SortField>,
}

impl SortSpec {
    /// Positional cursor schema for this sort. The final slot is the id
    /// tie-breaker and is carried opaquely.
    pub fn schema(&self) -> Vec<CursorSlot> {
        let last = self.fields.len().saturating_sub(1);
        self.fields
            .iter()
            .enumerate()
            .map(|(i, f)| match f.target {
                _ if i == last => CursorSlot::Opaque,
                SortTarget::Score => CursorSlot::Float,
                SortTarget::Field(d) if d.is_integral() => CursorSlot::Int,
                SortTarget::Field(_) => CursorSlot::Float,
            })
            .collect()
    }
}

fn natural_order(key: SortKey) -> Order {
    match key {
        SortKey::Relevance | SortKey::Rating | SortKey::Weight => Order::Desc,
        SortKey::Rank => Order::Asc,
    }
}

/// Sort specification for a filter state.
///
/// Relevance sorts on `[score, rank, id]`. A numeric key sorts on
/// `[key, score, rank, id]`, dropping `rank` while a keyword search is
/// active. `reverse` inverts every entry.
pub fn sort_spec(filters: &FilterSet) -> SortSpec {
    let primary = natural_order(filters.sort);
    let mut fields = Vec::with_capacity(4);
    match filters.sort.field() {
        None => {
            fields.push(SortField::score(primary));
            fields.push(SortField::field(POPULARITY_FIELD, Order::Asc));
        }
        Some(field) => {
            fields.push(SortField::field(field, primary));
            fields.push(SortField::score(Order::Desc));
            if filters.keywords().is_none() {
                fields.push(SortField::field(POPULARITY_FIELD, Order::Asc));
            }
        }
    }
    fields.push(SortField::field(ID_FIELD, Order::Asc));
    if filters.reverse {
        for f in &mut fields {
            f.order = f.order.flip();
        }
    }
    SortSpec { fields }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// All terms required, last term prefix-matched, across boosted fields.
    Keywords {
        text: String,
        fields: Vec<(DocField, f32)>,
    },
    /// Membership of a tag id in a facet's nested list.
    Tag { facet: Facet, id: TagId },
    Range(FieldRange),
    All(Vec<Clause>),
    Any(Vec<Clause>),
}

impl Clause {
    pub fn to_elastic(&self) -> JsonValue {
        match self {
            Clause::Keywords { text, fields } => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(f, boost)| format!("{}^{}", f.as_str(), boost))
                    .collect();
                json!({"multi_match": {
                    "query": text,
                    "type": "bool_prefix",
                    "fields": fields,
                    "operator": "and",
                }})
            }
            Clause::Tag { facet, id } => json!({"nested": {
                "path": facet.path(),
                "query": {"term": {format!("{}.id", facet.path()): id}},
            }}),
            Clause::Range(r) => {
                let mut bounds = serde_json::Map::new();
                for (name, v) in [("gte", r.gte), ("gt", r.gt), ("lte", r.lte), ("lt", r.lt)] {
                    if let Some(v) = v {
                        bounds.insert(name.into(), json!(v));
                    }
                }
                json!({"range": {r.field.as_str(): bounds}})
            }
            Clause::All(cs) => json!({"bool": {
                "filter": cs.iter().map(Clause::to_elastic).collect::<Vec<_>>(),
            }}),
            Clause::Any(cs) => json!({"bool": {
                "should": cs.iter().map(Clause::to_elastic).collect::<Vec<_>>(),
                "minimum_should_match": 1,
            }}),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredQuery {
    pub must: Vec<Clause>,
    pub should: Vec<Clause>,
    pub filter: Vec<Clause>,
    pub sort: SortSpec,
    pub search_after: Option<Cursor>,
    pub size: usize,
}

/// Builds the query for one page. `cursor` holds the tokens of the previous
/// page's last hit; malformed or empty tokens start from the beginning.
pub fn compile(filters: &FilterSet, cursor: &[String], size: usize) -> StructuredQuery {
    let must = filters
        .keywords()
        .map(|text| Clause::Keywords {
            text: text.to_string(),
            fields: KEYWORD_FIELDS.to_vec(),
        })
        .into_iter()
        .collect();

    let should = Facet::ALL
        .into_iter()
        .flat_map(|facet| {
            filters
                .tags(facet)
                .iter()
                .map(move |&id| Clause::Tag { facet, id })
        })
        .collect();

    let filter = filters
        .bucket_groups()
        .into_iter()
        .map(|group| {
            Clause::Any(
                group
                    .into_iter()
                    .map(|ranges| match ranges.as_slice() {
                        [single] => Clause::Range(*single),
                        _ => Clause::All(ranges.into_iter().map(Clause::Range).collect()),
                    })
                    .collect(),
            )
        })
        .collect();

    let sort = sort_spec(filters);
    let search_after = cursor::decode(cursor, &sort.schema());
    StructuredQuery {
        must,
        should,
        filter,
        sort,
        search_after,
        size,
    }
}

impl StructuredQuery {
    /// Elasticsearch `_search` request body.
    pub fn to_elastic(&self) -> JsonValue {
        let render = |cs: &[Clause]| cs.iter().map(Clause::to_elastic).collect::<Vec<_>>();
        let sort: Vec<JsonValue> = self
            .sort
            .fields
            .iter()
            .map(|f| match f.target {
                SortTarget::Score => json!({"_score": {"order": f.order.as_str()}}),
                SortTarget::Field(d) if f.missing_last => {
                    json!({d.as_str(): {"order": f.order.as_str(), "missing": "_last"}})
                }
                SortTarget::Field(d) => json!({d.as_str(): {"order": f.order.as_str()}}),
            })
            .collect();
        let mut body = json!({
            "size": self.size,
            "query": {"bool": {
                "must": render(&self.must),
                "should": render(&self.should),
                "filter": render(&self.filter),
                // tag matches only boost; they never exclude documents
                "minimum_should_match": 0,
            }},
            "sort": sort,
        });
        if let Some(after) = &self.search_after {
            body["search_after"] = JsonValue::Array(after.iter().map(|v| v.to_json()).collect());
        }
        body
    }
}
