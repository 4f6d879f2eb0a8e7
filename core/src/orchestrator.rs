//! Sync Orchestrator: sequences the Fetcher and the two Exporters on each
//! trigger, with a single-slot coalescing gate so overlapping triggers never
//! run two syncs at once.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::error::Result;
use crate::export_commits::export_commits_to_patches;
use crate::export_patches::export_patches_to_commits;
use crate::fetch::{ensure_commit_clone, ensure_patch_clone};
use crate::model::SyncContext;
use crate::patch_vcs::PatchVcs;

/// What caused this sync. Webhook variants carry the project id from the
/// inbound payload so the orchestrator can drop triggers meant for some
/// other bridge before doing any work.
#[derive(Debug, Clone)]
pub enum Trigger {
  Initial,
  Poll,
  WebhookCommitSide { project_id: String },
  WebhookPatchSide { project_id: String },
}

impl Trigger {
  /// The project id a webhook trigger carries, if any. Not a security
  /// boundary — just a filter against accidental cross-wiring between
  /// bridges sharing one receiver.
  fn project_id(&self) -> Option<&str> {
    match self {
      Trigger::WebhookCommitSide { project_id } | Trigger::WebhookPatchSide { project_id } => {
        Some(project_id)
      }
      Trigger::Initial | Trigger::Poll => None,
    }
  }
}

pub struct SyncOrchestrator {
  ctx: SyncContext,
  bridge_id: String,
  patch_vcs: Box<dyn PatchVcs>,
  in_flight: AtomicBool,
  dirty: AtomicBool,
}

impl SyncOrchestrator {
  pub fn new(bridge_id: impl Into<String>, ctx: SyncContext, patch_vcs: Box<dyn PatchVcs>) -> Self {
    Self {
      ctx,
      bridge_id: bridge_id.into(),
      patch_vcs,
      in_flight: AtomicBool::new(false),
      dirty: AtomicBool::new(false),
    }
  }

  pub fn ctx(&self) -> &SyncContext {
    &self.ctx
  }

  /// Runs one full Fetcher → Commit→Patch → Patch→Commit pass. A webhook
  /// trigger whose project id doesn't name this bridge is dropped silently.
  pub fn run_once(&mut self, trigger: Trigger) -> Result<()> {
    if let Some(project_id) = trigger.project_id() {
      if project_id != self.bridge_id {
        debug!(
          "dropping trigger for project '{project_id}', this bridge is '{}'",
          self.bridge_id
        );
        return Ok(());
      }
    }

    info!("sync starting ({trigger:?}) for bridge '{}'", self.bridge_id);
    ensure_commit_clone(&self.ctx.commit_repo)?;
    ensure_patch_clone(&self.ctx.patch_repo, self.patch_vcs.as_ref())?;
    export_commits_to_patches(&mut self.ctx, self.patch_vcs.as_ref())?;
    export_patches_to_commits(&mut self.ctx, self.patch_vcs.as_ref())?;
    info!("sync finished for bridge '{}'", self.bridge_id);
    Ok(())
  }

  /// Coalescing entry point: if a sync is already running on this value (only
  /// reachable from another thread sharing `Arc<Mutex<_>>`-style ownership,
  /// since `run_once` itself is synchronous and single-threaded per call),
  /// marks the run "dirty" and returns immediately instead of queuing a
  /// second overlapping sync. Callers drain `take_dirty` after a run to
  /// decide whether to immediately schedule one more.
  pub fn try_run_once(&mut self, trigger: Trigger) -> Result<bool> {
    if self.in_flight.swap(true, Ordering::AcqRel) {
      debug!("sync already in flight, marking dirty and skipping this trigger");
      self.dirty.store(true, Ordering::Release);
      return Ok(false);
    }
    let result = self.run_once(trigger);
    self.in_flight.store(false, Ordering::Release);
    result.map(|()| true)
  }

  /// True exactly once if a trigger arrived while a sync was in flight;
  /// clears the flag on read.
  pub fn take_dirty(&self) -> bool {
    self.dirty.swap(false, Ordering::AcqRel)
  }
}
