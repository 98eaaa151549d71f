//! Provider credentials read from the environment.
//!
//! | Variable | Source |
//! |----------|--------|
//! | `SHODAN_API_KEY` | shodan |
//! | `VIRUSTOTAL_API_KEY` | virustotal |
//! | `HIBP_API_KEY` | hibp |
//! | `CENSYS_API_ID` + `CENSYS_API_SECRET` | censys (both required) |
//! | `GREYNOISE_API_KEY` | greynoise |
//! | `INTELX_API_KEY` | intelx |
//! | `OPENAI_API_KEY` | embeddings and risk analysis |
//!
//! A missing or empty variable means the source is not configured. That is
//! not an error: the source is simply never dispatched.

use std::fmt;

use crate::sources::SourceId;

#[derive(Clone, Default)]
pub struct Credentials {
    pub shodan: Option<String>,
    pub virustotal: Option<String>,
    pub hibp: Option<String>,
    pub censys_id: Option<String>,
    pub censys_secret: Option<String>,
    pub greynoise: Option<String>,
    pub intelx: Option<String>,
    pub openai: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            shodan: get("SHODAN_API_KEY"),
            virustotal: get("VIRUSTOTAL_API_KEY"),
            hibp: get("HIBP_API_KEY"),
            censys_id: get("CENSYS_API_ID"),
            censys_secret: get("CENSYS_API_SECRET"),
            greynoise: get("GREYNOISE_API_KEY"),
            intelx: get("INTELX_API_KEY"),
            openai: get("OPENAI_API_KEY"),
        }
    }

    /// The credential tuple for a source, or `None` if incomplete.
    pub fn for_source(&self, id: SourceId) -> Option<Vec<&str>> {
        match id {
            SourceId::Shodan => self.shodan.as_deref().map(|k| vec![k]),
            SourceId::VirusTotal => self.virustotal.as_deref().map(|k| vec![k]),
            SourceId::Hibp => self.hibp.as_deref().map(|k| vec![k]),
            SourceId::Censys => match (self.censys_id.as_deref(), self.censys_secret.as_deref()) {
                (Some(id), Some(secret)) => Some(vec![id, secret]),
                _ => None,
            },
            SourceId::GreyNoise => self.greynoise.as_deref().map(|k| vec![k]),
            SourceId::IntelX => self.intelx.as_deref().map(|k| vec![k]),
        }
    }

    pub fn has(&self, id: SourceId) -> bool {
        self.for_source(id).is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Credentials");
        for id in SourceId::ALL {
            s.field(id.as_str(), &self.has(id));
        }
        s.field("openai", &self.openai.is_some()).finish()
    }
}
