//! Configuration loading and default merging.
//!
//! The YAML document is a map of named sections. `default` is a template,
//! `ca` describes the root CA and every other section is a leaf certificate:
//!
//! ```yaml
//! default:
//!   path: certs
//!   ttl: 1 year
//!   key_length: 2048
//!   subject:
//!     org: Acme
//!     country: EE
//! ca:
//!   ttl: 10 years
//!   subject:
//!     cn: Acme NATS CA
//! server:
//!   dns: [nats.internal]
//!   subject:
//!     cn: nats.internal
//! ```
//!
//! Each section is laid over the template field by field. The TTL is the one
//! exception: a section either sets its own TTL or inherits the template's TTL
//! string and expiration together.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::cert::params::DistinguishedName;
use crate::error::{PkiError, Result};
use crate::ttl::Ttl;

const DEFAULT_SECTION: &str = "default";
const CA_SECTION: &str = "ca";

/// One section of the configuration file as written. `None` means unset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCertConfig {
    pub name: Option<String>,
    pub path: Option<String>,
    pub ttl: Option<String>,
    pub key_length: Option<usize>,
    pub dns: Option<Vec<String>>,
    pub subject: Option<RawSubject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSubject {
    pub cn: Option<String>,
    pub org: Option<String>,
    pub country: Option<String>,
}

/// Subject identity of a certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub common_name: String,
    pub organization: String,
    pub country: String,
}

impl Subject {
    pub fn to_distinguished_name(&self) -> DistinguishedName {
        DistinguishedName::builder()
            .common_name(self.common_name.clone())
            .organization(self.organization.clone())
            .country(self.country.clone())
            .build()
    }
}

/// A fully resolved entity: everything needed to produce one key and certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertSpec {
    /// Output file stem, unique within a run.
    pub name: String,
    pub output_path: PathBuf,
    pub ttl: Ttl,
    pub key_bits: usize,
    /// DNS subject alternative names; ignored for the CA.
    pub subject_alt_names: Vec<String>,
    pub subject: Subject,
}

impl CertSpec {
    pub fn expiration(&self) -> OffsetDateTime {
        self.ttl.expiration()
    }
}

/// The `default` section with its TTL already resolved.
#[derive(Debug, Clone, Default)]
struct DefaultTemplate {
    path: Option<String>,
    ttl: Option<Ttl>,
    key_length: Option<usize>,
    dns: Vec<String>,
    subject: RawSubject,
}

impl DefaultTemplate {
    fn from_raw(raw: RawCertConfig, now: OffsetDateTime) -> Result<Self> {
        let ttl = raw.ttl.as_deref().map(|t| Ttl::parse(t, now)).transpose()?;
        Ok(Self {
            path: raw.path,
            ttl,
            key_length: raw.key_length,
            dns: raw.dns.unwrap_or_default(),
            subject: raw.subject.unwrap_or_default(),
        })
    }

    /// Lays `entity` over the template. Set fields win, unset fields inherit.
    fn overlay(
        &self,
        section: &str,
        entity: &RawCertConfig,
        base_dir: &Path,
        now: OffsetDateTime,
    ) -> Result<CertSpec> {
        let name = entity.name.clone().unwrap_or_else(|| section.to_string());

        let ttl = match &entity.ttl {
            Some(raw) => Ttl::parse(raw, now)?,
            None => self.ttl.clone().ok_or_else(|| {
                PkiError::MergeResolutionError(format!(
                    "'{section}' has no ttl and the default section sets none"
                ))
            })?,
        };

        let key_bits = entity.key_length.or(self.key_length).ok_or_else(|| {
            PkiError::MergeResolutionError(format!(
                "'{section}' has no key_length and the default section sets none"
            ))
        })?;
        if key_bits == 0 {
            return Err(PkiError::MergeResolutionError(format!(
                "'{section}' has a key_length of 0"
            )));
        }

        let path = entity
            .path
            .as_deref()
            .or(self.path.as_deref())
            .unwrap_or_default();

        let subject_alt_names = entity.dns.clone().unwrap_or_else(|| self.dns.clone());

        let entity_subject = entity.subject.clone().unwrap_or_default();
        let pick = |own: Option<String>, inherited: &Option<String>| {
            own.or_else(|| inherited.clone()).unwrap_or_default()
        };
        let subject = Subject {
            common_name: pick(entity_subject.cn, &self.subject.cn),
            organization: pick(entity_subject.org, &self.subject.org),
            country: pick(entity_subject.country, &self.subject.country),
        };

        Ok(CertSpec {
            name,
            output_path: resolve_output_path(path, base_dir),
            ttl,
            key_bits,
            subject_alt_names,
            subject,
        })
    }
}

/// Output paths with a root are used as is; anything else is relative to the
/// directory holding the configuration file.
pub fn resolve_output_path(path: &str, base_dir: &Path) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.has_root() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    }
}

/// The CA and leaf specifications resolved from one configuration load.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub ca: CertSpec,
    /// Leaf specifications sorted by name.
    pub leaves: Vec<CertSpec>,
    pub base_dir: PathBuf,
}

impl ResolvedConfig {
    /// Reads and resolves the configuration file at `config_path`.
    ///
    /// Relative TTLs are computed against a single "now" taken here. With
    /// `debug` set the resolved configuration is logged.
    pub fn load(config_path: &Path, debug: bool) -> Result<Self> {
        let read_error =
            |e: std::io::Error| PkiError::ConfigReadError(format!("{}: {e}", config_path.display()));
        let absolute = std::path::absolute(config_path).map_err(read_error)?;
        let raw = fs::read(&absolute).map_err(read_error)?;

        let resolved = Self::resolve(&raw, &absolute, OffsetDateTime::now_utc())?;
        if debug {
            info!(config = ?resolved, "Resolved configuration");
        }
        Ok(resolved)
    }

    /// Resolves raw configuration bytes. `config_path` only anchors relative
    /// output paths; `now` anchors relative TTLs.
    pub fn resolve(raw: &[u8], config_path: &Path, now: OffsetDateTime) -> Result<Self> {
        let mut sections: BTreeMap<String, RawCertConfig> = serde_yaml::from_slice(raw)?;
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let template = match sections.remove(DEFAULT_SECTION) {
            Some(raw) => DefaultTemplate::from_raw(raw, now)?,
            None => DefaultTemplate::default(),
        };

        let ca_raw = sections.remove(CA_SECTION).ok_or_else(|| {
            PkiError::MergeResolutionError(format!("missing '{CA_SECTION}' section"))
        })?;
        let ca = template.overlay(CA_SECTION, &ca_raw, &base_dir, now)?;
        debug!(name = %ca.name, path = %ca.output_path.display(), ttl = %ca.ttl, "Resolved CA");

        let mut leaves = sections
            .iter()
            .map(|(section, raw)| template.overlay(section, raw, &base_dir, now))
            .collect::<Result<Vec<_>>>()?;
        leaves.sort_by(|a, b| a.name.cmp(&b.name));

        let mut names = HashSet::new();
        for spec in std::iter::once(&ca).chain(&leaves) {
            if !names.insert(spec.name.as_str()) {
                return Err(PkiError::MergeResolutionError(format!(
                    "certificate name '{}' is used more than once",
                    spec.name
                )));
            }
        }
        for leaf in &leaves {
            debug!(name = %leaf.name, path = %leaf.output_path.display(), ttl = %leaf.ttl, "Resolved leaf");
        }

        Ok(Self {
            ca,
            leaves,
            base_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-01-31 08:00:00 UTC);

    fn resolve(yaml: &str) -> Result<ResolvedConfig> {
        ResolvedConfig::resolve(yaml.as_bytes(), Path::new("/etc/pki/config.yaml"), NOW)
    }

    #[test]
    fn test_ca_inherits_defaults() {
        let config = resolve(
            r#"
default:
  key_length: 2048
  ttl: "1 year"
ca:
  path: "./out"
"#,
        )
        .unwrap();
        assert_eq!(config.ca.name, "ca");
        assert_eq!(config.ca.key_bits, 2048);
        assert_eq!(config.ca.expiration(), datetime!(2025-01-31 08:00:00 UTC));
        assert_eq!(config.ca.output_path, Path::new("/etc/pki/out"));
        assert!(config.leaves.is_empty());
    }

    #[test]
    fn test_ttl_is_inherited_whole() {
        let config = resolve(
            r#"
default: {key_length: 1024, ttl: "1 year"}
ca: {}
server: {ttl: "90 days"}
client: {}
"#,
        )
        .unwrap();
        let default_ttl = Ttl::parse("1 year", NOW).unwrap();
        assert_eq!(config.ca.ttl, default_ttl);

        let client = &config.leaves[0];
        assert_eq!(client.name, "client");
        assert_eq!(client.ttl, default_ttl);

        let server = &config.leaves[1];
        assert_eq!(server.ttl.raw(), "90 days");
        assert_eq!(server.expiration(), datetime!(2024-04-30 08:00:00 UTC));
    }

    #[test]
    fn test_month_ttl_truncates() {
        let config = resolve("ca: {ttl: 1 month, key_length: 1024}").unwrap();
        assert_eq!(config.ca.expiration(), datetime!(2024-02-29 08:00:00 UTC));
    }

    #[test]
    fn test_set_fields_win_unset_fields_inherit() {
        let config = resolve(
            r#"
default:
  path: certs
  ttl: 1 year
  key_length: 2048
  dns: [default.internal]
  subject: {cn: default, org: Acme, country: EE}
ca:
  key_length: 4096
  subject: {cn: Acme CA}
route:
  name: routes
  path: /srv/routes
  dns: [route.internal, route2.internal]
  subject: {org: Routes Inc}
account:
  dns: []
"#,
        )
        .unwrap();

        assert_eq!(config.ca.key_bits, 4096);
        assert_eq!(
            config.ca.subject,
            Subject {
                common_name: "Acme CA".to_string(),
                organization: "Acme".to_string(),
                country: "EE".to_string(),
            }
        );
        assert_eq!(config.ca.output_path, Path::new("/etc/pki/certs"));

        let names: Vec<_> = config.leaves.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["account", "routes"]);

        let account = &config.leaves[0];
        assert!(account.subject_alt_names.is_empty());
        assert_eq!(account.key_bits, 2048);
        assert_eq!(account.subject.common_name, "default");

        let route = &config.leaves[1];
        assert_eq!(route.output_path, Path::new("/srv/routes"));
        assert_eq!(route.subject_alt_names, ["route.internal", "route2.internal"]);
        assert_eq!(route.subject.common_name, "default");
        assert_eq!(route.subject.organization, "Routes Inc");
        assert_eq!(route.subject.country, "EE");
    }

    #[test]
    fn test_default_name_is_not_inherited() {
        let config = resolve("default: {name: shared, ttl: 1 day, key_length: 1024}\nca: {}\nserver: {}")
            .unwrap();
        assert_eq!(config.ca.name, "ca");
        assert_eq!(config.leaves[0].name, "server");
    }

    #[test]
    fn test_output_paths() {
        let base = Path::new("/etc/pki");
        assert_eq!(resolve_output_path("certs/server", base), Path::new("/etc/pki/certs/server"));
        assert_eq!(resolve_output_path("/var/lib/nats", base), Path::new("/var/lib/nats"));
        assert_eq!(resolve_output_path("", base), Path::new("/etc/pki"));
        assert_eq!(
            resolve_output_path("certs", Path::new("conf")),
            Path::new("conf/certs")
        );

        let config = ResolvedConfig::resolve(
            b"default: {ttl: 1 day, key_length: 1024}\nca: {path: certs/server}",
            Path::new("relative/dir/nats-tls.yaml"),
            NOW,
        )
        .unwrap();
        assert_eq!(config.ca.output_path, Path::new("relative/dir/certs/server"));
    }

    #[test]
    fn test_leaves_are_sorted_by_name() {
        let config = resolve(
            "default: {ttl: 1 day, key_length: 1024}\nca: {}\nzeta: {}\nalpha: {}\nmid: {name: beta}",
        )
        .unwrap();
        let names: Vec<_> = config.leaves.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_unknown_ttl_unit() {
        let err = resolve("default: {ttl: 5 fortnights, key_length: 1024}\nca: {}").unwrap_err();
        assert!(
            matches!(&err, PkiError::ConfigParseError(msg) if msg.contains("fortnights")),
            "{err}"
        );
    }

    #[test]
    fn test_resolution_errors() {
        let missing_ca = resolve("default: {ttl: 1 day, key_length: 1024}\nserver: {}");
        assert!(matches!(missing_ca, Err(PkiError::MergeResolutionError(_))));

        let missing_ttl = resolve("default: {key_length: 1024}\nca: {}");
        assert!(matches!(missing_ttl, Err(PkiError::MergeResolutionError(_))));

        let missing_bits = resolve("default: {ttl: 1 day}\nca: {}");
        assert!(matches!(missing_bits, Err(PkiError::MergeResolutionError(_))));

        let zero_bits = resolve("default: {ttl: 1 day}\nca: {key_length: 0}");
        assert!(matches!(zero_bits, Err(PkiError::MergeResolutionError(_))));

        let duplicate = resolve("default: {ttl: 1 day, key_length: 1024}\nca: {}\nserver: {name: ca}");
        assert!(matches!(duplicate, Err(PkiError::MergeResolutionError(_))));
    }

    #[test]
    fn test_parse_errors() {
        let unknown_field = resolve("ca: {ttl: 1 day, key_length: 1024, colour: blue}");
        assert!(matches!(unknown_field, Err(PkiError::ConfigParseError(_))));

        let bad_type = resolve("ca: {ttl: 1 day, key_length: lots}");
        assert!(matches!(bad_type, Err(PkiError::ConfigParseError(_))));

        let not_a_map = resolve("- ca\n- server");
        assert!(matches!(not_a_map, Err(PkiError::ConfigParseError(_))));
    }
}
