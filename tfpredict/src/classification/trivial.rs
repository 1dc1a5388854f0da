use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::helper_functions::read_id_list;
use crate::models::Superclass;

/// What a characteristic domain proves about a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainVerdict {
    Tf,
    Superclass(Superclass),
}

/// Curated domain ID -> definitive verdict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacteristicDomainMap {
    verdicts: HashMap<String, DomainVerdict>,
}

impl CharacteristicDomainMap {
    pub fn insert(&mut self, domain_id: &str, verdict: DomainVerdict) {
        if let Some(previous) = self.verdicts.insert(domain_id.to_string(), verdict) {
            if previous != verdict {
                warn!("{} listed as {:?} and {:?}, keeping the latter", domain_id, previous, verdict);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    /// The first annotated domain ID with a verdict decides; later
    /// characteristic domains are not consulted.
    pub fn first_match<'a>(&self, domain_ids: &[&'a str]) -> Option<(&'a str, DomainVerdict)> {
        domain_ids
            .iter()
            .find_map(|id| self.verdicts.get(*id).map(|verdict| (*id, *verdict)))
    }
}

/// The two curated sets: the superclass map drives trivial resolution, the
/// TF-only map can only overturn a non-TF verdict. They are loaded from
/// separate files and never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacteristicDomains {
    pub superclass: CharacteristicDomainMap,
    pub tf_only: CharacteristicDomainMap,
}

impl CharacteristicDomains {
    pub fn load(tf_file: &Path, class_files: &[PathBuf]) -> anyhow::Result<Self> {
        let mut domains = CharacteristicDomains::default();
        for id in read_id_list(tf_file)? {
            domains.tf_only.insert(&id, DomainVerdict::Tf);
        }
        for (index, file) in class_files.iter().enumerate() {
            let Some(superclass) = Superclass::from_index(index) else {
                anyhow::bail!("more class files than superclasses: {}", file.display());
            };
            for id in read_id_list(file)? {
                domains.superclass.insert(&id, DomainVerdict::Superclass(superclass));
            }
        }
        info!(
            "Characteristic domains: {} TF-only, {} superclass-specific",
            domains.tf_only.len(),
            domains.superclass.len()
        );
        Ok(domains)
    }

    /// Trivial resolution: first annotated domain that pins a superclass.
    pub fn resolve_trivially<'a>(&self, domain_ids: &[&'a str]) -> Option<(&'a str, Superclass)> {
        match self.superclass.first_match(domain_ids)? {
            (id, DomainVerdict::Superclass(superclass)) => Some((id, superclass)),
            (_, DomainVerdict::Tf) => None,
        }
    }

    /// First annotated domain that proves TF membership.
    pub fn tf_override<'a>(&self, domain_ids: &[&'a str]) -> Option<&'a str> {
        self.tf_only.first_match(domain_ids).map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn domains() -> CharacteristicDomains {
        let mut domains = CharacteristicDomains::default();
        domains.superclass.insert("IPR_ZF", DomainVerdict::Superclass(Superclass::ZincFinger));
        domains.superclass.insert("IPR_BZIP", DomainVerdict::Superclass(Superclass::BasicDomain));
        domains.tf_only.insert("IPR_TF", DomainVerdict::Tf);
        domains
    }

    #[test]
    fn first_annotated_match_wins() {
        let domains = domains();
        assert_eq!(
            domains.resolve_trivially(&["IPR_X", "IPR_BZIP", "IPR_ZF"]),
            Some(("IPR_BZIP", Superclass::BasicDomain))
        );
        assert_eq!(
            domains.resolve_trivially(&["IPR_ZF", "IPR_BZIP"]),
            Some(("IPR_ZF", Superclass::ZincFinger))
        );
    }

    #[test]
    fn tf_only_domains_do_not_resolve_trivially() {
        let domains = domains();
        assert_eq!(domains.resolve_trivially(&["IPR_TF"]), None);
        assert_eq!(domains.tf_override(&["IPR_X", "IPR_TF"]), Some("IPR_TF"));
        assert_eq!(domains.tf_override(&["IPR_ZF"]), None);
    }

    #[test]
    fn loads_class_files_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.path().join(name);
            let mut f = std::fs::File::create(&path).unwrap();
            write!(f, "{}", body).unwrap();
            path
        };
        let tf = write("domainsTF.txt", "IPR000001\n");
        let classes: Vec<PathBuf> = (0..5)
            .map(|i| write(&format!("domainsClass{i}.txt"), &format!("IPR10000{i}\n")))
            .collect();

        let domains = CharacteristicDomains::load(&tf, &classes).unwrap();
        assert_eq!(
            domains.resolve_trivially(&["IPR100003"]),
            Some(("IPR100003", Superclass::HelixTurnHelix))
        );
        assert_eq!(domains.tf_override(&["IPR000001"]), Some("IPR000001"));
    }
}
