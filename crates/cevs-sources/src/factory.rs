use std::sync::Arc;

use crate::config::SourceProviderConfig;
use crate::error::ProviderError;
use crate::providers::{EdgarProvider, EeaProvider, EpaProvider, IsoProvider, PolicyProvider};
use crate::traits::SourceProvider;

pub fn build_source_provider(
    cfg: SourceProviderConfig,
) -> Result<Arc<dyn SourceProvider>, ProviderError> {
    match cfg {
        SourceProviderConfig::Epa(c) => Ok(Arc::new(EpaProvider::new(c)?)),
        SourceProviderConfig::Iso(c) => Ok(Arc::new(IsoProvider::new(c)?)),
        SourceProviderConfig::Eea(c) => Ok(Arc::new(EeaProvider::new(c)?)),
        SourceProviderConfig::Edgar(c) => Ok(Arc::new(EdgarProvider::new(c)?)),
        SourceProviderConfig::Policy(c) => Ok(Arc::new(PolicyProvider::new(c)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgarConfig, EeaConfig, EpaConfig, IsoConfig, PolicyConfig};
    use cevs_core::SourceKind;

    #[test]
    fn factory_builds_every_kind() {
        let cases = vec![
            (SourceProviderConfig::Epa(EpaConfig::default()), SourceKind::Epa),
            (SourceProviderConfig::Iso(IsoConfig::default()), SourceKind::Iso),
            (SourceProviderConfig::Eea(EeaConfig::default()), SourceKind::Eea),
            (
                SourceProviderConfig::Edgar(EdgarConfig::default()),
                SourceKind::Edgar,
            ),
            (
                SourceProviderConfig::Policy(PolicyConfig::default()),
                SourceKind::Policy,
            ),
        ];
        for (cfg, kind) in cases {
            let provider = build_source_provider(cfg).expect("provider");
            assert_eq!(provider.kind(), kind);
            assert!(!provider.sample_records().is_empty());
        }
    }
}
