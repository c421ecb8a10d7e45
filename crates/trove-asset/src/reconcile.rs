//! Status reconciliation between the local and remote views

use crate::manifest::Manifest;
use crate::types::{Asset, AssetStatus, AssetType};
use trove_core::Version;

/// How a local asset relates to what the repository holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    /// Same key recorded in the repository
    Synced,
    /// Unknown to the repository, or ahead of every recorded version
    Unpublished,
    /// The repository holds a strictly newer version
    Outdated { latest: Version },
}

/// One classified entry of a [`DriftReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftEntry {
    pub asset_type: AssetType,
    pub name: String,
    pub version: Version,
    pub drift: Drift,
}

/// Per-asset classification produced by [`reconcile_publish`]
#[derive(Debug, Clone, Default)]
pub struct DriftReport {
    pub entries: Vec<DriftEntry>,
}

impl DriftReport {
    pub fn outdated(&self) -> impl Iterator<Item = &DriftEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.drift, Drift::Outdated { .. }))
    }

    pub fn count(&self, wanted: fn(&Drift) -> bool) -> usize {
        self.entries.iter().filter(|e| wanted(&e.drift)).count()
    }

    pub fn get(&self, asset: &Asset) -> Option<Drift> {
        self.entries
            .iter()
            .find(|e| {
                e.asset_type == asset.asset_type && e.name == asset.name && e.version == asset.version
            })
            .map(|e| e.drift)
    }
}

fn classify(asset: &Asset, remote: &Manifest) -> Drift {
    if remote.has_asset(asset.asset_type, &asset.name, asset.version) {
        return Drift::Synced;
    }
    match remote.latest_version(asset.asset_type, &asset.name) {
        Some(latest) if latest > asset.version => Drift::Outdated { latest },
        _ => Drift::Unpublished,
    }
}

/// Mark every local asset `Synced` or `Unpublished` against `remote`
pub fn reconcile_publish(local: &mut Manifest, remote: &Manifest) -> DriftReport {
    let mut report = DriftReport::default();
    for asset in local.iter_mut() {
        let drift = classify(asset, remote);
        asset.status = match drift {
            Drift::Synced => AssetStatus::Synced,
            Drift::Unpublished | Drift::Outdated { .. } => AssetStatus::Unpublished,
        };
        if let Drift::Outdated { latest } = drift {
            tracing::debug!(asset = %asset, %latest, "repository holds a newer version");
        }
        report.entries.push(DriftEntry {
            asset_type: asset.asset_type,
            name: asset.name.clone(),
            version: asset.version,
            drift,
        });
    }
    report
}

/// Mark every remote asset `Local` or `NonLocal` against `local`
pub fn reconcile_install(remote: &mut Manifest, local: &Manifest) {
    for asset in remote.iter_mut() {
        asset.status = if local.has_asset(asset.asset_type, &asset.name, asset.version) {
            AssetStatus::Local
        } else {
            AssetStatus::NonLocal
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gizmo(name: &str, version: Version) -> Asset {
        Asset::new(name, version, AssetType::Gizmo, format!("/nuke/{}.gizmo", name))
    }

    fn remote() -> Manifest {
        let mut remote = Manifest::new();
        remote.add_asset(gizmo("blur", Version::new(1, 0, 0)));
        remote.add_asset(gizmo("blur", Version::new(1, 2, 0)));
        remote.add_asset(gizmo("grain", Version::new(0, 1, 0)));
        remote
    }

    #[test]
    fn test_reconcile_publish_classifies() {
        let mut local = Manifest::new();
        local.add_asset(gizmo("blur", Version::new(1, 0, 0)));
        local.add_asset(gizmo("blur", Version::new(1, 1, 0)));
        local.add_asset(gizmo("grain", Version::new(0, 2, 0)));
        local.add_asset(gizmo("fresh", Version::ZERO));

        let report = reconcile_publish(&mut local, &remote());
        assert_eq!(report.entries.len(), 4);

        let synced = local.get_asset(AssetType::Gizmo, "blur", Version::new(1, 0, 0)).unwrap();
        assert_eq!(synced.status, AssetStatus::Synced);
        assert_eq!(report.get(synced), Some(Drift::Synced));

        let behind = local.get_asset(AssetType::Gizmo, "blur", Version::new(1, 1, 0)).unwrap();
        assert_eq!(behind.status, AssetStatus::Unpublished);
        assert_eq!(
            report.get(behind),
            Some(Drift::Outdated {
                latest: Version::new(1, 2, 0)
            })
        );

        let ahead = local.get_asset(AssetType::Gizmo, "grain", Version::new(0, 2, 0)).unwrap();
        assert_eq!(report.get(ahead), Some(Drift::Unpublished));

        assert_eq!(report.outdated().count(), 1);
        assert_eq!(report.count(|d| matches!(d, Drift::Unpublished)), 2);
    }

    #[test]
    fn test_reconcile_publish_is_recomputed() {
        let mut local = Manifest::new();
        local.add_asset(gizmo("blur", Version::new(1, 0, 0)));
        reconcile_publish(&mut local, &remote());
        reconcile_publish(&mut local, &Manifest::new());
        let asset = local.get_asset(AssetType::Gizmo, "blur", Version::new(1, 0, 0)).unwrap();
        assert_eq!(asset.status, AssetStatus::Unpublished);
    }

    #[test]
    fn test_reconcile_install() {
        let mut local = Manifest::new();
        local.add_asset(gizmo("blur", Version::new(1, 2, 0)));

        let mut remote = remote();
        reconcile_install(&mut remote, &local);

        let statuses: Vec<_> = remote.iter().map(|a| (a.to_string(), a.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("blur_v1.0.0".to_string(), AssetStatus::NonLocal),
                ("blur_v1.2.0".to_string(), AssetStatus::Local),
                ("grain_v0.1.0".to_string(), AssetStatus::NonLocal),
            ]
        );
    }
}
