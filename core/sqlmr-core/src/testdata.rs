//! Sample tables for demos, tests and benchmarks
//!
//! Three small reference tables (`user`, `product`, `store`) and a random
//! `sale` fact table with columns
//! `user_id,product_id,store_id,quantity,day,hour`.

use crate::error::SqlmrResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// `id,name,country`
pub const USERS: &[[&str; 3]] = &[
    ["0", "Matt Damon", "United States"],
    ["1", "Arnold Schwarzenegger", "Australia"],
    ["2", "Brad Pitt", "United States"],
    ["3", "Jack Nicholson", "Germany"],
    ["4", "Marlon Brando", "Italy"],
    ["5", "Robert De Niro", "United States"],
    ["6", "Al Pacino", "Germany"],
    ["7", "Daniel Day-Lewis", "United States"],
    ["8", "Dustin Hoffman", "Australia"],
    ["9", "Tom Hanks", "Italy"],
    ["10", "Anthony Hopkins", "Germany"],
    ["11", "Denzel Washington", "United States"],
    ["12", "Michael Caine", "Australia"],
    ["13", "Robin Williams", "United States"],
    ["14", "Robert Duvall", "Italy"],
    ["15", "Gene Hackman", "Italy"],
    ["16", "Morgan Freeman", "United States"],
    ["17", "Sean Penn", "Australia"],
    ["18", "Jeff Bridges", "Germany"],
    ["19", "Clint Eastwood", "United States"],
];

/// `id,title,price`
pub const PRODUCTS: &[[&str; 3]] = &[
    ["0", "Grand Theft Auto V", "59.99"],
    ["1", "Dragon Age: Inquisition", "59.99"],
    ["2", "Minecraft: PlayStation 4 Edition", "29.89"],
    ["3", "Far Cry 4", "59.99"],
    ["4", "Middle-earth: Shadow of Mordor", "40.99"],
    ["5", "Call of Duty: Advanced Warfare", "59.99"],
    ["6", "NBA 2K15", "25.59"],
    ["7", "FIFA 15", "40.99"],
    ["8", "The Wolf Among Us", "25.59"],
    ["9", "Alien: Isolation", "40.99"],
    ["10", "Destiny", "40.99"],
    ["11", "LittleBigPlanet 3", "29.89"],
    ["12", "Watch Dogs: Bad Blood", "15.79"],
    ["13", "LEGO Batman 3: Beyond Gotham", "15.79"],
    ["14", "Assassin's Creed Unity", "59.99"],
    ["15", "Just Dance 2015", "25.59"],
    ["16", "NHL 15", "25.59"],
    ["17", "The Last of Us Remastered", "40.99"],
    ["18", "Diablo III: Ultimate Evil Edition", "29.89"],
    ["19", "Final Fantasy XIV Online: A Realm Reborn", "15.79"],
    ["20", "Battlefield 4", "15.79"],
    ["21", "Tomb Raider: Definitive Edition", "25.59"],
    ["22", "Assassin's Creed IV: Black Flag", "15.79"],
    ["23", "LEGO Marvel Super Heroes", "29.89"],
    ["24", "Madden NFL 15", "25.59"],
];

/// `id,city`
pub const STORES: &[[&str; 2]] = &[
    ["0", "New York"],
    ["1", "Boston"],
    ["2", "Houston"],
    ["3", "Washington"],
    ["4", "Philadelphia"],
    ["5", "San Francisco"],
    ["6", "Miami"],
    ["7", "Chicago"],
    ["8", "Los Angeles"],
    ["9", "Phoenix"],
    ["10", "San Antonio"],
    ["11", "San Diego"],
    ["12", "Dallas"],
];

/// Recreate `base` with the four tables, one directory and file per table.
///
/// The same `seed` always produces the same `sale` rows.
pub fn generate(base: &Path, sale_rows: usize, seed: u64) -> SqlmrResult<()> {
    if base.exists() {
        fs::remove_dir_all(base)?;
    }
    fs::create_dir_all(base)?;

    write_table(base, "user", USERS.iter().map(|r| r.join(",")))?;
    write_table(base, "product", PRODUCTS.iter().map(|r| r.join(",")))?;
    write_table(base, "store", STORES.iter().map(|r| r.join(",")))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let sales = (0..sale_rows).map(|_| sale_row(&mut rng));
    write_table(base, "sale", sales)?;

    info!(path = %base.display(), sale_rows, "test data generated");
    Ok(())
}

fn sale_row(rng: &mut StdRng) -> String {
    let user = USERS[rng.gen_range(0..USERS.len())][0];
    let product = PRODUCTS[rng.gen_range(0..PRODUCTS.len())][0];
    let store = STORES[rng.gen_range(0..STORES.len())][0];
    let quantity = rng.gen_range(1..=5);
    let day = rng.gen_range(1..=31);
    let hour = rng.gen_range(0..24);
    format!("{user},{product},{store},{quantity},{day},{hour}")
}

/// `<base>/<table>/<table>.csv`, no trailing newline.
fn write_table(base: &Path, table: &str, rows: impl Iterator<Item = String>) -> SqlmrResult<()> {
    let dir = base.join(table);
    fs::create_dir_all(&dir)?;
    let mut out = BufWriter::new(File::create(dir.join(format!("{table}.csv")))?);
    for (i, row) in rows.enumerate() {
        if i > 0 {
            out.write_all(b"\n")?;
        }
        out.write_all(row.as_bytes())?;
    }
    out.flush()?;
    Ok(())
}
