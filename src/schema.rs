/// Column-name and file-name constants for canna-dashkit schema.
/// Single source of truth for every CSV touched by the loaders.

// ── Licensee directory columns ──────────────────────────────────────────────
pub mod licensee {
    pub const GLOBAL_ID: &str = "global_id";
    pub const NAME: &str = "name";
    pub const ADDRESS1: &str = "address1";
    pub const ADDRESS2: &str = "address2";
    pub const CITY: &str = "city";

    pub const ALL: [&str; 5] = [GLOBAL_ID, NAME, ADDRESS1, ADDRESS2, CITY];
}

// ── Sales time-series columns ───────────────────────────────────────────────
pub mod sales {
    pub const SOLD_AT: &str = "sold_at";
    pub const DATE_FORMAT: &str = "%Y-%m-%d";
}

// ── Default file names under the data directory ─────────────────────────────
pub mod files {
    pub const LICENSEES: &str = "Licensees_0.csv";
    pub const TOTAL_SALES: &str = "total_sales.csv";
    pub const MEDICAL_SALES: &str = "medical_sales.csv";
    pub const RECREATIONAL_SALES: &str = "recreational_sales.csv";
}
