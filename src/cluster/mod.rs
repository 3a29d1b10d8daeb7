pub mod error;
pub mod kubectl;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use error::ClusterError;
pub use kubectl::Kubectl;
pub use types::PodPhase;

/// The cluster control plane, as seen by the submission loop.
///
/// Every call blocks the run until the control plane answers.
#[allow(async_fn_in_trait)]
pub trait ClusterClient {
    /// Every job the cluster currently knows about, with its phase.
    async fn list_pods(&self) -> Result<Vec<PodPhase>, ClusterError>;

    /// Submit a rendered manifest.
    async fn apply(&self, manifest: &str) -> Result<(), ClusterError>;

    /// Output of the named job.
    async fn logs(&self, name: &str) -> Result<Vec<u8>, ClusterError>;

    /// Remove the named job from the cluster.
    async fn delete(&self, name: &str) -> Result<(), ClusterError>;
}
