//! Version conflict resolution for publish and install

use crate::manifest::Manifest;
use crate::types::Asset;
use std::collections::VecDeque;
use trove_core::{Result, TroveError, Version, VersionField};

/// Questions the resolver asks whoever drives it.
///
/// A terminal prompt, a GUI dialog, or a batch policy each answer these
/// differently. Returning an error aborts resolution with that error.
pub trait DecisionPort {
    /// `asset` already exists at `latest`. Publish a new version anyway?
    fn publish_new_version(&mut self, asset: &Asset, latest: Version) -> Result<bool>;

    /// A newer version `latest` exists. Move up to it and bump from there?
    fn update_to_latest(&mut self, asset: &Asset, latest: Version) -> Result<bool>;

    /// Which version field to increment
    fn choose_bump(&mut self, asset: &Asset) -> Result<VersionField>;

    /// `asset` is already installed locally. Install it again?
    fn reinstall(&mut self, asset: &Asset) -> Result<bool>;
}

/// Strategy for answering conflict questions without a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Answer "no": conflicts abort
    Abort,
    /// Answer "yes" and bump the given field
    Bump(VersionField),
}

/// Pre-resolved decisions for non-interactive runs
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub conflict: ConflictPolicy,
    pub reinstall: bool,
}

impl Preset {
    pub fn new(conflict: ConflictPolicy) -> Self {
        Self {
            conflict,
            reinstall: false,
        }
    }

    pub fn with_reinstall(mut self, reinstall: bool) -> Self {
        self.reinstall = reinstall;
        self
    }
}

impl DecisionPort for Preset {
    fn publish_new_version(&mut self, _asset: &Asset, _latest: Version) -> Result<bool> {
        Ok(matches!(self.conflict, ConflictPolicy::Bump(_)))
    }

    fn update_to_latest(&mut self, _asset: &Asset, _latest: Version) -> Result<bool> {
        Ok(matches!(self.conflict, ConflictPolicy::Bump(_)))
    }

    fn choose_bump(&mut self, asset: &Asset) -> Result<VersionField> {
        match self.conflict {
            ConflictPolicy::Bump(field) => Ok(field),
            ConflictPolicy::Abort => Err(TroveError::NoDecisionPolicy(format!(
                "no bump field configured for {}",
                asset
            ))),
        }
    }

    fn reinstall(&mut self, _asset: &Asset) -> Result<bool> {
        Ok(self.reinstall)
    }
}

/// Decision port for non-interactive runs with no policy: every question
/// is a hard error instead of a silent default.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

impl DecisionPort for Unattended {
    fn publish_new_version(&mut self, asset: &Asset, latest: Version) -> Result<bool> {
        Err(TroveError::NoDecisionPolicy(format!(
            "{} already exists at {}",
            asset.name, latest
        )))
    }

    fn update_to_latest(&mut self, asset: &Asset, latest: Version) -> Result<bool> {
        Err(TroveError::NoDecisionPolicy(format!(
            "{} is behind the published {}",
            asset, latest
        )))
    }

    fn choose_bump(&mut self, asset: &Asset) -> Result<VersionField> {
        Err(TroveError::NoDecisionPolicy(format!(
            "cannot choose a version bump for {}",
            asset
        )))
    }

    fn reinstall(&mut self, asset: &Asset) -> Result<bool> {
        Err(TroveError::NoDecisionPolicy(format!(
            "{} is already installed",
            asset
        )))
    }
}

/// A scripted answer for [`ScriptedDecisions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Bump(VersionField),
}

/// Replays a fixed queue of answers; running out is an error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    answers: VecDeque<Answer>,
    asked: usize,
}

impl ScriptedDecisions {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    /// Number of questions asked so far
    pub fn asked(&self) -> usize {
        self.asked
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, question: &str) -> Result<Answer> {
        self.asked += 1;
        self.answers
            .pop_front()
            .ok_or_else(|| TroveError::NoDecisionPolicy(format!("no scripted answer for: {}", question)))
    }

    fn next_bool(&mut self, question: &str) -> Result<bool> {
        match self.next(question)? {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            Answer::Bump(_) => Err(TroveError::NoDecisionPolicy(format!(
                "expected yes/no for: {}",
                question
            ))),
        }
    }
}

impl DecisionPort for ScriptedDecisions {
    fn publish_new_version(&mut self, asset: &Asset, _latest: Version) -> Result<bool> {
        self.next_bool(&format!("publish a new version of {}", asset))
    }

    fn update_to_latest(&mut self, asset: &Asset, latest: Version) -> Result<bool> {
        self.next_bool(&format!("update {} to {}", asset, latest))
    }

    fn choose_bump(&mut self, asset: &Asset) -> Result<VersionField> {
        match self.next(&format!("bump {}", asset))? {
            Answer::Bump(field) => Ok(field),
            other => Err(TroveError::NoDecisionPolicy(format!(
                "expected a bump field for {}, got {:?}",
                asset, other
            ))),
        }
    }

    fn reinstall(&mut self, asset: &Asset) -> Result<bool> {
        self.next_bool(&format!("reinstall {}", asset))
    }
}

/// Why resolution stopped without accepting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The candidate matches the latest recorded version
    AlreadyExists { latest: Version },
    /// A newer version is already recorded
    NewerExists { latest: Version },
}

impl AbortReason {
    pub fn message(&self, asset: &Asset) -> String {
        match self {
            AbortReason::AlreadyExists { latest } => format!(
                "{}_v{} already exists; not publishing over it",
                asset.name, latest
            ),
            AbortReason::NewerExists { latest } => format!(
                "a newer version of {} exists ({}); not publishing a lower version",
                asset, latest
            ),
        }
    }
}

/// Terminal outcome of a resolution
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The asset, possibly with a bumped version, may be committed
    Accepted(Asset),
    /// The caller declined; the asset is returned unchanged
    Aborted { asset: Asset, reason: AbortReason },
}

impl Resolution {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Resolution::Accepted(_))
    }

    /// Turn an abort into [`TroveError::Aborted`]
    pub fn into_accepted(self) -> Result<Asset> {
        match self {
            Resolution::Accepted(asset) => Ok(asset),
            Resolution::Aborted { asset, reason } => {
                Err(TroveError::Aborted(reason.message(&asset)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Compare,
    ConflictEqual(Version),
    ConflictBehind(Version),
    Bump,
}

/// Reconciles a candidate's version against the highest version recorded in
/// a target manifest, asking a [`DecisionPort`] when they conflict.
pub struct VersionResolver<'a> {
    decisions: &'a mut dyn DecisionPort,
}

impl<'a> VersionResolver<'a> {
    pub fn new(decisions: &'a mut dyn DecisionPort) -> Self {
        Self { decisions }
    }

    /// Run the compare / conflict / bump loop until accept or abort.
    ///
    /// Each bump strictly increases the version, so the loop cannot cycle.
    pub fn resolve(&mut self, mut asset: Asset, target: &Manifest) -> Result<Resolution> {
        let original = asset.version;
        let mut state = State::Compare;

        loop {
            state = match state {
                State::Compare => {
                    match target.latest_version(asset.asset_type, &asset.name) {
                        None => {
                            tracing::info!(asset = %asset, "new asset, nothing to resolve");
                            return Ok(Resolution::Accepted(asset));
                        }
                        Some(latest) if asset.version > latest => {
                            tracing::debug!(asset = %asset, %latest, "ahead of latest recorded version");
                            return Ok(Resolution::Accepted(asset));
                        }
                        Some(latest) if asset.version == latest => State::ConflictEqual(latest),
                        Some(latest) => State::ConflictBehind(latest),
                    }
                }
                State::ConflictEqual(latest) => {
                    if self.decisions.publish_new_version(&asset, latest)? {
                        State::Bump
                    } else {
                        asset.version = original;
                        return Ok(Resolution::Aborted {
                            asset,
                            reason: AbortReason::AlreadyExists { latest },
                        });
                    }
                }
                State::ConflictBehind(latest) => {
                    if self.decisions.update_to_latest(&asset, latest)? {
                        asset.version = latest;
                        State::Bump
                    } else {
                        asset.version = original;
                        return Ok(Resolution::Aborted {
                            asset,
                            reason: AbortReason::NewerExists { latest },
                        });
                    }
                }
                State::Bump => {
                    let field = self.decisions.choose_bump(&asset)?;
                    let bumped = asset.version.bump(field)?;
                    tracing::debug!(asset = %asset, %field, to = %bumped, "bumped version");
                    asset.version = bumped;
                    State::Compare
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetType;

    fn gizmo(version: &str) -> Asset {
        Asset::new(
            "blur",
            Version::parse(version).unwrap(),
            AssetType::Gizmo,
            "/nuke/blur.gizmo",
        )
    }

    fn manifest_with(versions: &[&str]) -> Manifest {
        let mut manifest = Manifest::new();
        for v in versions {
            manifest.add_asset(gizmo(v));
        }
        manifest
    }

    #[test]
    fn test_new_asset_is_accepted() {
        let mut decisions = ScriptedDecisions::default();
        let resolution = VersionResolver::new(&mut decisions)
            .resolve(gizmo("1.0.0"), &Manifest::new())
            .unwrap();
        let asset = resolution.into_accepted().unwrap();
        assert_eq!(asset.version, Version::new(1, 0, 0));
        assert_eq!(decisions.asked(), 0);
    }

    #[test]
    fn test_ahead_of_latest_is_accepted() {
        let mut decisions = ScriptedDecisions::default();
        let target = manifest_with(&["0.9.0", "1.0.0"]);
        let resolution = VersionResolver::new(&mut decisions)
            .resolve(gizmo("1.0.1"), &target)
            .unwrap();
        assert!(resolution.is_accepted());
        assert_eq!(decisions.asked(), 0);
    }

    #[test]
    fn test_equal_then_bump_minor() {
        let mut decisions = ScriptedDecisions::new([Answer::Yes, Answer::Bump(VersionField::Minor)]);
        let target = manifest_with(&["1.0.0"]);
        let asset = VersionResolver::new(&mut decisions)
            .resolve(gizmo("1.0.0"), &target)
            .unwrap()
            .into_accepted()
            .unwrap();
        assert_eq!(asset.version, Version::new(1, 1, 0));
        assert_eq!(decisions.remaining(), 0);
    }

    #[test]
    fn test_equal_declined_aborts() {
        let mut decisions = ScriptedDecisions::new([Answer::No]);
        let target = manifest_with(&["1.0.0"]);
        let resolution = VersionResolver::new(&mut decisions)
            .resolve(gizmo("1.0.0"), &target)
            .unwrap();
        match resolution {
            Resolution::Aborted { reason, .. } => assert_eq!(
                reason,
                AbortReason::AlreadyExists {
                    latest: Version::new(1, 0, 0)
                }
            ),
            other => panic!("expected abort, got {:?}", other),
        }
    }

    #[test]
    fn test_behind_declined_aborts_and_leaves_target_alone() {
        let mut decisions = ScriptedDecisions::new([Answer::No]);
        let target = manifest_with(&["2.0.0"]);
        let resolution = VersionResolver::new(&mut decisions)
            .resolve(gizmo("1.0.0"), &target)
            .unwrap();

        let err = resolution.into_accepted().unwrap_err();
        assert!(err.is_aborted());
        assert_eq!(target.len(), 1);
        assert_eq!(
            target.latest_version(AssetType::Gizmo, "blur"),
            Some(Version::new(2, 0, 0))
        );
    }

    #[test]
    fn test_behind_promotes_to_latest_then_bumps() {
        let mut decisions = ScriptedDecisions::new([Answer::Yes, Answer::Bump(VersionField::Patch)]);
        let target = manifest_with(&["1.0.0", "2.3.1"]);
        let asset = VersionResolver::new(&mut decisions)
            .resolve(gizmo("1.0.0"), &target)
            .unwrap()
            .into_accepted()
            .unwrap();
        assert_eq!(asset.version, Version::new(2, 3, 2));
    }

    #[test]
    fn test_unversioned_draft_against_published() {
        let mut decisions = ScriptedDecisions::new([Answer::Yes, Answer::Bump(VersionField::Major)]);
        let target = manifest_with(&["1.4.2"]);
        let asset = VersionResolver::new(&mut decisions)
            .resolve(gizmo("0.0.0"), &target)
            .unwrap()
            .into_accepted()
            .unwrap();
        assert_eq!(asset.version, Version::new(2, 0, 0));
    }

    #[test]
    fn test_aborted_asset_keeps_original_version() {
        let target = manifest_with(&["3.0.0"]);
        let mut decisions = ScriptedDecisions::new([Answer::No]);
        let resolution = VersionResolver::new(&mut decisions)
            .resolve(gizmo("1.0.0"), &target)
            .unwrap();
        match resolution {
            Resolution::Aborted { asset, .. } => assert_eq!(asset.version, Version::new(1, 0, 0)),
            other => panic!("expected abort, got {:?}", other),
        }
    }

    #[test]
    fn test_unattended_conflict_is_hard_error() {
        let target = manifest_with(&["1.0.0"]);
        let err = VersionResolver::new(&mut Unattended)
            .resolve(gizmo("1.0.0"), &target)
            .unwrap_err();
        assert!(matches!(err, TroveError::NoDecisionPolicy(_)));
        assert!(!err.is_aborted());

        // No conflict, no question
        let ok = VersionResolver::new(&mut Unattended).resolve(gizmo("1.0.1"), &target);
        assert!(ok.unwrap().is_accepted());
    }

    #[test]
    fn test_preset_policies() {
        let target = manifest_with(&["1.0.0"]);

        let mut bump = Preset::new(ConflictPolicy::Bump(VersionField::Patch));
        let asset = VersionResolver::new(&mut bump)
            .resolve(gizmo("1.0.0"), &target)
            .unwrap()
            .into_accepted()
            .unwrap();
        assert_eq!(asset.version, Version::new(1, 0, 1));

        let mut abort = Preset::new(ConflictPolicy::Abort);
        let resolution = VersionResolver::new(&mut abort)
            .resolve(gizmo("1.0.0"), &target)
            .unwrap();
        assert!(!resolution.is_accepted());
    }

    #[test]
    fn test_bump_overflow_stops_resolution() {
        let saturated = "1.0.18446744073709551615";
        let target = manifest_with(&[saturated]);
        let mut bump = Preset::new(ConflictPolicy::Bump(VersionField::Patch));
        let err = VersionResolver::new(&mut bump)
            .resolve(gizmo(saturated), &target)
            .unwrap_err();
        assert!(matches!(err, TroveError::VersionOverflow { .. }));

        // Bumping a higher field still works
        let mut minor = Preset::new(ConflictPolicy::Bump(VersionField::Minor));
        let asset = VersionResolver::new(&mut minor)
            .resolve(gizmo(saturated), &target)
            .unwrap()
            .into_accepted()
            .unwrap();
        assert_eq!(asset.version, Version::new(1, 1, 0));
    }

    #[test]
    fn test_scripted_runs_out() {
        let target = manifest_with(&["1.0.0"]);
        let mut decisions = ScriptedDecisions::new([Answer::Yes]);
        let err = VersionResolver::new(&mut decisions)
            .resolve(gizmo("1.0.0"), &target)
            .unwrap_err();
        assert!(matches!(err, TroveError::NoDecisionPolicy(_)));
    }
}
