use crate::traits::{AfterKey, BucketPage, Hit, HitsPage, SearchEngine};
use gamefinder_core::cursor::SortValue;
use gamefinder_core::{
    Clause, DocField, Facet, Game, Order, Result, SearchError, SortField, SortTarget,
    StructuredQuery, Tag, Total, TotalRelation,
};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Reference engine evaluating compiled queries over an in-memory catalog.
///
/// Mirrors the Elasticsearch semantics the read path relies on: filter
/// clauses restrict, should clauses only add score, missing sort values go
/// last, and `search_after` resumes strictly after the cursor position.
#[derive(Clone, Default)]
pub struct InMemoryEngine {
    games: Arc<RwLock<Vec<Game>>>,
}

impl InMemoryEngine {
    pub fn new(games: Vec<Game>) -> Self {
        Self {
            games: Arc::new(RwLock::new(games)),
        }
    }

    /// Loads a JSON array of games.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .map_err(|e| SearchError::Config(format!("read {}: {}", path.display(), e)))?;
        let games: Vec<Game> = serde_json::from_slice(&raw)
            .map_err(|e| SearchError::Config(format!("parse {}: {}", path.display(), e)))?;
        tracing::info!(games = games.len(), path = %path.display(), "loaded seed catalog");
        Ok(Self::new(games))
    }

    pub fn len(&self) -> usize {
        self.games.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or replaces a game by id.
    pub fn upsert(&self, game: Game) {
        let mut games = self.games.write();
        match games.iter_mut().find(|g| g.id == game.id) {
            Some(slot) => *slot = game,
            None => games.push(game),
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Score of an all-terms-required, last-term-prefix match; `None` if some
/// term matches no field.
fn keyword_score(text: &str, fields: &[(DocField, f32)], game: &Game) -> Option<f64> {
    let terms = tokenize(text);
    let field_tokens: Vec<(Vec<String>, f32)> = fields
        .iter()
        .map(|(f, boost)| (f.text(game).map(tokenize).unwrap_or_default(), *boost))
        .collect();
    let mut score = 0.0;
    for (i, term) in terms.iter().enumerate() {
        let prefix = i + 1 == terms.len();
        let best = field_tokens
            .iter()
            .filter(|(tokens, _)| {
                tokens
                    .iter()
                    .any(|t| t == term || (prefix && t.starts_with(term.as_str())))
            })
            .map(|(_, boost)| f64::from(*boost))
            .fold(None, |acc: Option<f64>, b| Some(acc.map_or(b, |a| a.max(b))));
        score += best?;
    }
    Some(score)
}

fn has_tag(facet: Facet, id: u32, game: &Game) -> bool {
    facet.tags(game).iter().any(|t| t.id == id)
}

fn matches(clause: &Clause, game: &Game) -> bool {
    match clause {
        Clause::Keywords { text, fields } => keyword_score(text, fields, game).is_some(),
        Clause::Tag { facet, id } => has_tag(*facet, *id, game),
        Clause::Range(r) => r.field.numeric(game).is_some_and(|v| r.contains(v)),
        Clause::All(cs) => cs.iter().all(|c| matches(c, game)),
        Clause::Any(cs) => cs.iter().any(|c| matches(c, game)),
    }
}

/// Score contribution of a scoring clause, `None` when it does not match.
fn clause_score(clause: &Clause, game: &Game) -> Option<f64> {
    match clause {
        Clause::Keywords { text, fields } => keyword_score(text, fields, game),
        other => matches(other, game).then_some(1.0),
    }
}

fn score(query: &StructuredQuery, game: &Game) -> Option<f64> {
    if !query.filter.iter().all(|c| matches(c, game)) {
        return None;
    }
    let mut total = 0.0;
    for clause in &query.must {
        total += clause_score(clause, game)?;
    }
    total += query
        .should
        .iter()
        .filter_map(|c| clause_score(c, game))
        .sum::<f64>();
    Some(total)
}

fn sort_value(field: &SortField, game: &Game, score: f64) -> SortValue {
    match field.target {
        SortTarget::Score => SortValue::Float(score),
        SortTarget::Field(d) => match d.numeric(game) {
            Some(v) if d.is_integral() => SortValue::Int(v as i64),
            Some(v) => SortValue::Float(v),
            None => SortValue::Null,
        },
    }
}

fn as_number(v: &SortValue) -> Option<f64> {
    match v {
        SortValue::Int(i) => Some(*i as f64),
        SortValue::Float(f) => Some(*f),
        SortValue::Raw(s) => s.parse().ok(),
        SortValue::Null => None,
    }
}

fn compare(spec: &[SortField], a: &[SortValue], b: &[SortValue]) -> Ordering {
    for (field, (x, y)) in spec.iter().zip(a.iter().zip(b)) {
        let ord = match (as_number(x), as_number(y)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = x.total_cmp(&y);
                match field.order {
                    Order::Asc => ord,
                    Order::Desc => ord.reverse(),
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn to_page(hits: Vec<Hit>, offset: usize, limit: usize) -> HitsPage {
    let total = Total {
        value: hits.len() as u64,
        relation: TotalRelation::Eq,
    };
    let hits = hits.into_iter().skip(offset).take(limit).collect();
    HitsPage { hits, total }
}

#[async_trait::async_trait]
impl SearchEngine for InMemoryEngine {
    async fn search(&self, query: &StructuredQuery) -> Result<HitsPage> {
        let spec = &query.sort.fields;
        let mut hits: Vec<Hit> = self
            .games
            .read()
            .iter()
            .filter_map(|game| {
                let score = score(query, game)?;
                let sort = spec.iter().map(|f| sort_value(f, game, score)).collect();
                Some(Hit {
                    game: game.clone(),
                    score,
                    sort,
                })
            })
            .collect();
        hits.sort_by(|a, b| compare(spec, &a.sort, &b.sort));
        let start = match &query.search_after {
            Some(after) => hits
                .iter()
                .position(|h| compare(spec, &h.sort, after) == Ordering::Greater)
                .unwrap_or(hits.len()),
            None => 0,
        };
        Ok(to_page(hits, start, query.size))
    }

    async fn facet_page(
        &self,
        facet: Facet,
        after: Option<&AfterKey>,
        size: usize,
    ) -> Result<BucketPage> {
        let keys: BTreeSet<AfterKey> = self
            .games
            .read()
            .iter()
            .flat_map(|g| facet.tags(g).iter())
            .map(|t| AfterKey {
                id: t.id,
                name: t.name.clone(),
            })
            .collect();
        let page: Vec<AfterKey> = keys
            .into_iter()
            .filter(|k| after.map_or(true, |a| k > a))
            .take(size)
            .collect();
        Ok(BucketPage {
            after_key: page.last().cloned(),
            buckets: page.into_iter().map(|k| Tag::new(k.id, k.name)).collect(),
        })
    }

    async fn query_string(&self, query: &str, offset: usize, limit: usize) -> Result<HitsPage> {
        let needle = query.to_lowercase();
        let mut games: Vec<Game> = self
            .games
            .read()
            .iter()
            .filter(|g| g.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        games.sort_by_key(|g| (g.rank, g.id));
        let hits = games
            .into_iter()
            .map(|game| Hit {
                game,
                score: 1.0,
                sort: Vec::new(),
            })
            .collect();
        Ok(to_page(hits, offset, limit))
    }
}
