/// Static EPG/logo/group metadata attached to every playlist entry of a category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryMeta {
    pub tvg_id: &'static str,
    pub logo_url: &'static str,
    pub group: &'static str,
}

const fn meta(tvg_id: &'static str, logo_url: &'static str, group: &'static str) -> CategoryMeta {
    CategoryMeta {
        tvg_id,
        logo_url,
        group,
    }
}

pub const MISC_KEY: &str = "misc";

/// Lookup order matters for substring matching: first key contained in the input wins.
pub const CATEGORY_TABLE: &[(&str, CategoryMeta)] = &[
    ("soccer", meta("Soccer.Dummy.us", "https://i.postimg.cc/HsWHFvV0/Soccer.png", "Soccer")),
    ("mlb", meta("MLB.Baseball.Dummy.us", "https://i.postimg.cc/FsFmwC7K/Baseball3.png", "MLB")),
    ("nba", meta("NBA.Basketball.Dummy.us", "https://i.postimg.cc/jdqKB3LW/Basketball-2.png", "NBA")),
    ("nfl", meta("Football.Dummy.us", "https://i.postimg.cc/tRNpSGCq/Maxx.png", "NFL")),
    ("nhl", meta("NHL.Hockey.Dummy.us", "https://i.postimg.cc/mgMRQ7FR/nhl-logo-png-seeklogo-534236.png", "NHL")),
    ("fighting", meta("PPV.EVENTS.Dummy.us", "https://i.postimg.cc/8c4GjMnH/Combat-Sports.png", "Combat Sports")),
    ("motorsports", meta("Racing.Dummy.us", "https://i.postimg.cc/yY6B2pkv/F1.png", "Motorsports")),
    ("ufc", meta("UFC.Fight.Pass.Dummy.us", "https://i.postimg.cc/59Sb7W9D/Combat-Sports2.png", "UFC")),
    ("ppv", meta("PPV.EVENTS.Dummy.us", "https://i.postimg.cc/mkj4tC62/PPV.png", "PPV")),
    ("wwe-streams", meta("PPV.EVENTS.Dummy.us", "https://i.postimg.cc/wTxHn47J/WWE2.png", "WWE")),
    ("f1", meta("Racing.Dummy.us", "https://i.postimg.cc/yY6B2pkv/F1.png", "Formula 1")),
    ("f1-streams", meta("Racing.Dummy.us", "https://i.postimg.cc/yY6B2pkv/F1.png", "Formula 1")),
    ("nascar", meta("Racing.Dummy.us", "https://i.postimg.cc/m2dR43HV/Motorsports2.png", "NASCAR Cup Series")),
    (MISC_KEY, meta("Sports.Dummy.us", "https://i.postimg.cc/qMm0rc3L/247.png", "Random Events")),
];

fn misc() -> &'static CategoryMeta {
    // MISC_KEY is the last table row
    &CATEGORY_TABLE[CATEGORY_TABLE.len() - 1].1
}

/// Lower-cases, trims and drops every "-streams"/"streams" fragment. Empty keys become "misc".
pub fn normalize_key(key: &str) -> String {
    let key = key.trim().to_lowercase();
    let key = if key.is_empty() { MISC_KEY.to_string() } else { key };
    key.replace("-streams", "").replace("streams", "")
}

pub fn metadata_for(key: &str) -> &'static CategoryMeta {
    let key = normalize_key(key);

    if let Some((_, meta)) = CATEGORY_TABLE.iter().find(|(k, _)| *k == key) {
        return meta;
    }
    CATEGORY_TABLE
        .iter()
        .find(|(k, _)| key.contains(k))
        .map(|(_, meta)| meta)
        .unwrap_or_else(misc)
}
