//! Trade terminology used for query and document expansion.
//!
//! The dictionary is ordered: categories, canonical terms and synonyms keep the
//! order they were declared in, and expansion output follows that order.

/// Canonical term and the alternate spellings technicians use for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub canonical: String,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCategory {
    pub name: String,
    pub entries: Vec<TermEntry>,
}

/// Read-only mapping category → canonical term → synonyms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermDictionary {
    categories: Vec<TermCategory>,
}

impl TermDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, name: &str, entries: &[(&str, &[&str])]) -> Self {
        let entries = entries
            .iter()
            .map(|(canonical, synonyms)| TermEntry {
                canonical: canonical.to_lowercase(),
                synonyms: synonyms.iter().map(|s| s.to_lowercase()).collect(),
            })
            .collect();
        self.categories.push(TermCategory {
            name: name.to_string(),
            entries,
        });
        self
    }

    pub fn categories(&self) -> &[TermCategory] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&TermCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// All entries in declaration order, across categories.
    pub fn entries(&self) -> impl Iterator<Item = &TermEntry> {
        self.categories.iter().flat_map(|c| c.entries.iter())
    }

    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// HVAC, refrigerant, plumbing and electrical vocabulary.
    pub fn trade_defaults() -> Self {
        Self::new()
            .with_category("refrigerants", REFRIGERANTS)
            .with_category("hvac", HVAC)
            .with_category("plumbing", PLUMBING)
            .with_category("electrical", ELECTRICAL)
    }
}

type Entries = &'static [(&'static str, &'static [&'static str])];

const REFRIGERANTS: Entries = &[
    ("r410a", &["r-410a", "410a", "puron", "az20", "410 freon", "r410", "r 410a"]),
    ("r22", &["r-22", "r22 freon", "freon", "22", "r 22"]),
    ("r407c", &["r-407c", "407c", "407 freon", "r407", "r 407c"]),
    ("r134a", &["r-134a", "134a", "134 freon", "r134", "r 134a"]),
    ("r404a", &["r-404a", "404a", "404 freon", "r404", "r 404a"]),
    ("r32", &["r-32", "32", "r32 freon", "r 32"]),
    ("r454b", &["r-454b", "454b", "r454", "r 454b"]),
    ("r407a", &["r-407a", "407a", "407a freon", "r407", "r 407a"]),
    ("r417a", &["r-417a", "417a", "mo59", "r417", "r 417a"]),
    ("r422d", &["r-422d", "422d", "mo29", "r422", "r 422d"]),
    ("r438a", &["r-438a", "438a", "mo99", "r438", "r 438a"]),
    ("r421a", &["r-421a", "421a", "choice r421a", "r421", "r 421a"]),
    ("r427a", &["r-427a", "427a", "forane 427a", "r427", "r 427a"]),
    ("r453a", &["r-453a", "453a", "rs-70", "r453", "r 453a"]),
    ("r458a", &["r-458a", "458a", "r458", "r 458a"]),
    ("r420a", &["r-420a", "420a", "r420", "r 420a", "rb276"]),
    ("r416a", &["r-416a", "416a", "fr12", "r416", "r 416a"]),
    ("r414b", &["r-414b", "414b", "hot shot", "r414", "r 414b"]),
    ("r422b", &["r-422b", "422b", "nu22b", "r422", "r 422b"]),
    ("r422c", &["r-422c", "422c", "os24", "r422", "r 422c"]),
];

const HVAC: Entries = &[
    ("compressor", &["comp", "pump", "ac compressor"]),
    ("condenser", &["outdoor coil", "condenser coil", "outdoor unit"]),
    ("evaporator", &["evap coil", "indoor coil", "a coil", "cooling coil"]),
    ("txv", &["thermal expansion valve", "expansion valve", "metering device"]),
    ("air handler", &["ahu", "indoor unit", "blower unit"]),
    ("heat pump", &["hp", "reverse cycle", "heating cooling unit"]),
    ("furnace", &["heater", "heating unit", "gas furnace"]),
    ("thermostat", &["tstat", "t-stat", "temperature control"]),
    ("capacitor", &["cap", "run cap", "start cap"]),
    ("contactor", &["magnetic contactor", "power relay", "starter"]),
    ("disconnect", &["service disconnect", "safety switch", "pull out"]),
    ("filter drier", &["drier", "filter dryer", "liquid line drier"]),
    ("recovery machine", &["reclaim machine", "refrigerant recovery unit"]),
    ("vacuum pump", &["vac pump", "evacuation pump"]),
    ("manifold gauges", &["gauge set", "charging manifold", "test kit"]),
    ("micron gauge", &["vacuum gauge", "electronic vacuum gauge"]),
    ("superheat", &["sh", "superheat temperature"]),
    ("subcooling", &["sc", "subcool", "subcooling temperature"]),
];

const PLUMBING: Entries = &[
    ("pex", &["cross-linked polyethylene", "flexible water line"]),
    ("cpvc", &["chlorinated polyvinyl chloride", "plastic pipe"]),
    ("copper", &["cu", "copper pipe", "copper tubing"]),
    ("pvc", &["polyvinyl chloride", "drain pipe"]),
    ("abs", &["acrylonitrile butadiene styrene", "black pipe"]),
    ("p-trap", &["trap", "drain trap", "sink trap"]),
    ("cleanout", &["co", "cleanout access", "drain cleanout"]),
    ("ball valve", &["shutoff valve", "isolation valve"]),
    ("gate valve", &["main valve", "full port valve"]),
    ("check valve", &["backflow preventer", "one way valve"]),
    ("pressure reducer", &["prv", "pressure reducing valve"]),
    ("vacuum breaker", &["avb", "anti-siphon valve"]),
];

const ELECTRICAL: Entries = &[
    ("disconnect", &["service disconnect", "safety switch", "pull out"]),
    ("contactor", &["magnetic contactor", "power relay", "starter"]),
    ("capacitor", &["cap", "run cap", "start cap"]),
    ("transformer", &["xfmr", "trafo", "24v transformer"]),
    ("circuit breaker", &["breaker", "cb", "overcurrent protection"]),
    ("wire nut", &["wire connector", "marette", "wire splice"]),
    ("conduit", &["emt", "rigid", "flex"]),
    ("junction box", &["j-box", "junction", "pull box"]),
    ("multimeter", &["dmm", "meter", "tester"]),
    ("voltage drop", &["vd", "voltage loss", "line loss"]),
];
