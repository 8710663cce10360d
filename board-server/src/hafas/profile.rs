//! Endpoint profiles.
//!
//! A profile fixes which `transport.rest` deployment is queried and which
//! product (transport-type) identifiers that deployment knows about. The
//! product catalog is what the fetcher subtracts the configured exclusions
//! from to obtain the included-types set.

use std::fmt;

use serde::Deserialize;

/// A supported HAFAS endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Deutsche Bahn, nationwide Germany.
    Db,
    /// Verkehrsverbund Berlin-Brandenburg.
    Vbb,
    /// Berliner Verkehrsbetriebe.
    Bvg,
}

impl Profile {
    /// Base URL of the public deployment for this profile.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Profile::Db => "https://v6.db.transport.rest",
            Profile::Vbb => "https://v6.vbb.transport.rest",
            Profile::Bvg => "https://v6.bvg.transport.rest",
        }
    }

    /// Product identifiers this profile's departures may carry in
    /// `line.product`.
    pub fn products(&self) -> &'static [&'static str] {
        match self {
            Profile::Db => &[
                "nationalExpress",
                "national",
                "regionalExpress",
                "regional",
                "suburban",
                "bus",
                "ferry",
                "subway",
                "tram",
                "taxi",
            ],
            Profile::Vbb | Profile::Bvg => &[
                "suburban",
                "subway",
                "tram",
                "bus",
                "ferry",
                "express",
                "regional",
            ],
        }
    }

    /// The profile's name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Db => "db",
            Profile::Vbb => "vbb",
            Profile::Bvg => "bvg",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
