#![allow(dead_code)]

use gamefinder_core::{Game, Tag};

const MECHANICS: [(u32, &str); 5] = [
    (2001, "Dice Rolling"),
    (2002, "Hand Management"),
    (2003, "Set Collection"),
    (2004, "Worker Placement"),
    (2005, "Deck Building"),
];

const THEMES: [(u32, &str); 3] = [(1001, "Economic"), (1002, "Fantasy"), (1003, "Space")];

const WORDS: [&str; 8] = [
    "Harbor", "Castle", "Orbit", "Market", "Forest", "River", "Empire", "Garden",
];

/// A deterministic catalog with plenty of sort ties and some unweighted games.
pub fn catalog(n: u32) -> Vec<Game> {
    (0..n)
        .map(|i| {
            let min_players = 1 + i % 3;
            Game {
                id: 10_000 + (i * 37) % 997,
                slug: format!("game-{}", i),
                name: format!("{} {}", WORDS[(i % 8) as usize], WORDS[((i / 8) % 8) as usize]),
                description: Some(format!("A game about the {}", WORDS[((i + 3) % 8) as usize])),
                expected_playtime: 15 + (i % 6) * 25,
                min_players,
                max_players: min_players + i % 5,
                min_age: 6 + (i % 4) * 3,
                rank: 1 + i * 13 % 211,
                rating: 5.0 + f64::from(i % 7) * 0.5,
                num_ratings: 50 + i * 331,
                weight: (i % 9 != 0).then(|| 1.0 + f64::from(i % 5) * 0.75),
                year_published: 1990 + (i % 30) as i32,
                mechanics: MECHANICS
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| (i as usize + k) % 3 == 0)
                    .map(|(_, (id, name))| Tag::new(*id, *name))
                    .collect(),
                categories: vec![Tag::new(THEMES[(i % 3) as usize].0, THEMES[(i % 3) as usize].1)],
                ..Default::default()
            }
        })
        .collect()
}

pub fn game(id: u32, name: &str) -> Game {
    Game {
        id,
        slug: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        rank: id,
        ..Default::default()
    }
}
