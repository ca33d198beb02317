//! `FilterSet` ⇄ URL query string.
//!
//! Decoding is fail-open: unknown keys, unknown bucket tags and unparsable
//! values are dropped so stale or hand-edited links degrade to defaults.
//! Encoding omits default fields and emits keys in a fixed order, so the same
//! filter state always produces byte-identical output.

use crate::filter::{Bucket, FilterSet, SortKey};
use std::collections::BTreeSet;
use url::form_urlencoded;

pub const KEYWORDS: &str = "keywords";
pub const SORT: &str = "sort";
pub const REVERSE: &str = "reverse";
pub const RANK: &str = "rank";
pub const RATING: &str = "rating";
pub const RATING_COUNT: &str = "ratingCount";
pub const AGE: &str = "age";
pub const WEIGHT: &str = "weight";
pub const PLAYTIME: &str = "playtime";
pub const PLAYERS: &str = "players";
pub const MECHANICS: &str = "mechanics";
pub const THEMES: &str = "themes";
/// Repeated, ordered cursor tokens. Not part of the filter state.
pub const SEARCH_AFTER_KEY: &str = "searchAfterKey";

pub fn decode(params: &str) -> FilterSet {
    decode_pairs(parse(params))
}

pub fn decode_pairs<I, K, V>(pairs: I) -> FilterSet
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut f = FilterSet::default();
    for (key, value) in pairs {
        let value = value.as_ref();
        match key.as_ref() {
            KEYWORDS => f.keywords = value.to_string(),
            SORT => {
                if let Some(k) = SortKey::from_tag(value) {
                    f.sort = k;
                }
            }
            REVERSE => {
                if let Some(b) = parse_bool(value) {
                    f.reverse = b;
                }
            }
            RANK => insert_bucket(&mut f.rank, value),
            RATING => insert_bucket(&mut f.rating, value),
            RATING_COUNT => insert_bucket(&mut f.rating_count, value),
            AGE => insert_bucket(&mut f.age, value),
            WEIGHT => insert_bucket(&mut f.weight, value),
            PLAYTIME => insert_bucket(&mut f.playtime, value),
            PLAYERS => insert_bucket(&mut f.players, value),
            MECHANICS => insert_id(&mut f.mechanics, value),
            THEMES => insert_id(&mut f.themes, value),
            _ => {}
        }
    }
    f
}

/// Splits a full request query string into the filter state and the ordered
/// cursor tokens carried alongside it.
pub fn decode_request(params: &str) -> (FilterSet, Vec<String>) {
    let mut cursor = Vec::new();
    let mut rest = Vec::new();
    for (k, v) in parse(params) {
        if k == SEARCH_AFTER_KEY {
            cursor.push(v.into_owned());
        } else {
            rest.push((k, v));
        }
    }
    (decode_pairs(rest), cursor)
}

pub fn encode(f: &FilterSet) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    append(&mut ser, f);
    ser.finish()
}

/// Filter state plus cursor tokens, as sent to `/api/search`.
pub fn encode_request(f: &FilterSet, cursor: &[String]) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    append(&mut ser, f);
    for token in cursor {
        ser.append_pair(SEARCH_AFTER_KEY, token);
    }
    ser.finish()
}

fn append(ser: &mut form_urlencoded::Serializer<'_, String>, f: &FilterSet) {
    let default = FilterSet::default();
    if f.keywords != default.keywords {
        ser.append_pair(KEYWORDS, &f.keywords);
    }
    if f.sort != default.sort {
        ser.append_pair(SORT, f.sort.tag());
    }
    if f.reverse != default.reverse {
        ser.append_pair(REVERSE, if f.reverse { "true" } else { "false" });
    }
    append_buckets(ser, RANK, &f.rank);
    append_buckets(ser, RATING, &f.rating);
    append_buckets(ser, RATING_COUNT, &f.rating_count);
    append_buckets(ser, AGE, &f.age);
    append_buckets(ser, WEIGHT, &f.weight);
    append_buckets(ser, PLAYTIME, &f.playtime);
    append_buckets(ser, PLAYERS, &f.players);
    for id in &f.mechanics {
        ser.append_pair(MECHANICS, &id.to_string());
    }
    for id in &f.themes {
        ser.append_pair(THEMES, &id.to_string());
    }
}

fn append_buckets<B: Bucket>(
    ser: &mut form_urlencoded::Serializer<'_, String>,
    key: &str,
    set: &BTreeSet<B>,
) {
    for b in set {
        ser.append_pair(key, b.tag());
    }
}

fn parse(params: &str) -> form_urlencoded::Parse<'_> {
    form_urlencoded::parse(params.strip_prefix('?').unwrap_or(params).as_bytes())
}

fn parse_bool(v: &str) -> Option<bool> {
    match v {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn insert_bucket<B: Bucket>(set: &mut BTreeSet<B>, tag: &str) {
    if let Some(b) = B::from_tag(tag) {
        set.insert(b);
    }
}

fn insert_id(set: &mut BTreeSet<u32>, raw: &str) {
    if let Ok(id) = raw.trim().parse() {
        set.insert(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AgeBucket, PlayersBucket, RankBucket, RatingCountBucket, WeightBucket};

    fn busy() -> FilterSet {
        let mut f = FilterSet {
            keywords: "ticket to ride & co".into(),
            sort: SortKey::Weight,
            reverse: true,
            ..Default::default()
        };
        f.rank.insert(RankBucket::Top100);
        f.rating_count.insert(RatingCountBucket::Huge);
        f.age.insert(AgeBucket::Teen);
        f.weight.insert(WeightBucket::Heavy);
        f.weight.insert(WeightBucket::Light);
        f.players.insert(PlayersBucket::Two);
        f.players.insert(PlayersBucket::EightPlus);
        f.mechanics.extend([2023, 11]);
        f.themes.insert(1010);
        f
    }

    #[test]
    fn default_encodes_empty() {
        assert_eq!(encode(&FilterSet::default()), "");
        assert_eq!(decode(""), FilterSet::default());
    }

    #[test]
    fn roundtrip_busy_filter() {
        let f = busy();
        assert_eq!(decode(&encode(&f)), f);
    }

    #[test]
    fn encoding_is_stable_and_ordered() {
        let a = busy();
        // insertion order differs, set contents do not
        let mut b = busy();
        b.mechanics.clear();
        b.mechanics.extend([11, 2023]);
        assert_eq!(encode(&a), encode(&b));
        assert_eq!(
            encode(&a),
            "keywords=ticket+to+ride+%26+co&sort=weight&reverse=true&rank=1-100\
             &ratingCount=10000%2B&age=10-14&weight=1-2&weight=4-5&players=2\
             &players=8%2B&mechanics=11&mechanics=2023&themes=1010"
        );
    }

    #[test]
    fn unknown_keys_and_values_are_dropped() {
        let f = decode("?sort=popularity&reverse=maybe&age=99-100&players=2&mechanics=abc&utm_source=x");
        let mut expected = FilterSet::default();
        expected.players.insert(PlayersBucket::Two);
        assert_eq!(f, expected);
    }

    #[test]
    fn explicit_defaults_decode_to_default() {
        assert!(decode("sort=relevance&reverse=false").is_default());
        assert_eq!(encode(&decode("sort=relevance&reverse=false")), "");
    }

    #[test]
    fn request_splits_cursor_tokens_in_order() {
        let f = busy();
        let cursor = vec!["3.25".to_string(), "-inf".to_string(), "174430".to_string()];
        let (back, tokens) = decode_request(&encode_request(&f, &cursor));
        assert_eq!(back, f);
        assert_eq!(tokens, cursor);
    }
}
