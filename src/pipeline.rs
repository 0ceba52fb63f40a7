//! The patch run orchestrator
//!
//! Processes the resource manifest strictly in order: download one resource,
//! merge it into the target bundle, delete the temp file, then move on. The
//! first failure from a download or a merge aborts the remaining resources.
//!
//! There is no rollback: merges already applied when a later resource fails
//! stay applied, so an aborted run can leave the bundle partially patched.

use crate::config::{PatchRequest, REQUIRED_RESOURCES};
use crate::error::{Error, Result};
use crate::fetcher;
use crate::patcher::MergeTool;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Runs complete patch requests against a target bundle
pub struct Pipeline {
    client: reqwest::Client,
    tool: MergeTool,
}

/// Working directory for one run: either caller-supplied or owned by the run
/// and removed when it ends.
enum WorkDir {
    Provided(PathBuf),
    Owned(TempDir),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Provided(dir) => dir.as_path(),
            WorkDir::Owned(dir) => dir.path(),
        }
    }
}

impl Pipeline {
    /// Create a pipeline that merges resources with the given tool
    pub fn new(tool: MergeTool) -> Self {
        Self {
            client: reqwest::Client::new(),
            tool,
        }
    }

    /// Execute one patch run.
    ///
    /// Verifies the target bundle exists before touching the network or
    /// spawning any process, then processes every manifest resource in order.
    /// Returns the first error encountered; resources after a failed one are
    /// never attempted.
    pub async fn run(&self, request: &PatchRequest) -> Result<()> {
        // The merge tool runs with the working directory as its cwd, so the
        // target path must survive that cwd change. Canonicalizing also
        // implements the existence precondition.
        let target = tokio::fs::canonicalize(&request.target)
            .await
            .map_err(|_| Error::InvalidTarget {
                path: request.target.clone(),
            })?;
        let metadata = tokio::fs::metadata(&target)
            .await
            .map_err(|_| Error::InvalidTarget {
                path: request.target.clone(),
            })?;
        if !metadata.is_file() {
            return Err(Error::InvalidTarget {
                path: request.target.clone(),
            });
        }

        let work = match &request.working_dir {
            Some(dir) => WorkDir::Provided(dir.clone()),
            None => WorkDir::Owned(tempfile::tempdir()?),
        };

        tracing::info!(
            target = %target.display(),
            tzdata = %request.tzdata_version,
            icu = %request.icu_version,
            endianness = %request.endianness,
            "patching timezone data"
        );

        for resource in REQUIRED_RESOURCES {
            self.process_resource(request, resource, &target, work.path())
                .await?;
        }

        tracing::info!(target = %target.display(), "bundle patched");
        Ok(())
    }

    /// Download, merge, and clean up a single resource.
    async fn process_resource(
        &self,
        request: &PatchRequest,
        resource: &str,
        target: &Path,
        work: &Path,
    ) -> Result<()> {
        let url = request.resource_url(resource)?;
        let dest = work.join(resource);

        tracing::info!(%url, "downloading");
        fetcher::fetch(&self.client, &url, &dest).await?;

        tracing::info!(resource, "merging into bundle");
        if let Err(e) = self.tool.merge(resource, target, work).await {
            // The run is over; the downloaded file must not outlive it.
            // Removal is best-effort and never replaces the merge error.
            if let Err(cleanup) = tokio::fs::remove_file(&dest).await {
                tracing::warn!(
                    path = %dest.display(),
                    error = %cleanup,
                    "failed to remove resource file after merge failure"
                );
            }
            return Err(e);
        }

        // The merge already succeeded, so a leftover temp file is a
        // filesystem inconsistency worth a warning, not a run failure.
        if let Err(e) = tokio::fs::remove_file(&dest).await {
            tracing::warn!(
                path = %dest.display(),
                error = %e,
                "failed to remove merged resource file"
            );
        }

        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESOURCE_PREFIX: &str = "/2019c/44/le";

    /// Mount a 200 response with a small body for one resource.
    async fn mount_resource(server: &MockServer, name: &str) {
        Mock::given(method("GET"))
            .and(path(format!("{RESOURCE_PREFIX}/{name}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(format!("body of {name}").into_bytes()),
            )
            .mount(server)
            .await;
    }

    /// Paths of all requests the mock server has seen, in arrival order.
    async fn requested_paths(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }

    fn stub_target(dir: &Path) -> PathBuf {
        let target = dir.join("icudt61l.dat");
        // 2 MB stub bundle
        std::fs::write(&target, vec![0u8; 2 * 1024 * 1024]).unwrap();
        target
    }

    fn request_for(target: PathBuf, server: &MockServer, work: &Path) -> PatchRequest {
        let mut request = PatchRequest::new(target);
        request.base_url = server.uri();
        request.working_dir = Some(work.to_path_buf());
        request
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, body: &str) -> MergeTool {
        use std::os::unix::fs::PermissionsExt;

        let bin = dir.join("icupkg");
        std::fs::write(&bin, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        MergeTool::new(bin)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_processes_all_resources_in_order_and_leaves_no_temp_files() {
        let server = MockServer::start().await;
        for name in REQUIRED_RESOURCES {
            mount_resource(&server, name).await;
        }

        let target_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let tool_dir = TempDir::new().unwrap();
        // Record every invocation; cwd is the working directory.
        let tool = fake_tool(tool_dir.path(), r#"echo "$@" >> calls.txt"#);

        let target = stub_target(target_dir.path());
        let request = request_for(target, &server, work.path());

        Pipeline::new(tool).run(&request).await.unwrap();

        // All four resources requested, in manifest order
        let paths = requested_paths(&server).await;
        let expected: Vec<String> = REQUIRED_RESOURCES
            .iter()
            .map(|n| format!("{RESOURCE_PREFIX}/{n}"))
            .collect();
        assert_eq!(paths, expected);

        // All four merges ran, in manifest order
        let calls = std::fs::read_to_string(work.path().join("calls.txt")).unwrap();
        let merged: Vec<&str> = calls
            .lines()
            .map(|l| l.split_whitespace().nth(1).unwrap())
            .collect();
        assert_eq!(merged, REQUIRED_RESOURCES);

        // No resource temp files remain
        for name in REQUIRED_RESOURCES {
            assert!(!work.path().join(name).exists(), "{name} left behind");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_passes_an_absolute_target_path_to_the_tool() {
        let server = MockServer::start().await;
        for name in REQUIRED_RESOURCES {
            mount_resource(&server, name).await;
        }

        let target_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let tool_dir = TempDir::new().unwrap();
        let tool = fake_tool(tool_dir.path(), r#"echo "$3" >> targets.txt"#);

        let target = stub_target(target_dir.path());
        let request = request_for(target, &server, work.path());

        Pipeline::new(tool).run(&request).await.unwrap();

        let targets = std::fs::read_to_string(work.path().join("targets.txt")).unwrap();
        for line in targets.lines() {
            assert!(
                Path::new(line).is_absolute(),
                "target must be absolute so the tool's cwd change cannot break it: {line}"
            );
        }
    }

    #[tokio::test]
    async fn run_fails_before_any_network_call_when_target_is_missing() {
        let server = MockServer::start().await;
        for name in REQUIRED_RESOURCES {
            mount_resource(&server, name).await;
        }

        let work = TempDir::new().unwrap();
        let request = request_for(
            PathBuf::from("/nonexistent/icudt61l.dat"),
            &server,
            work.path(),
        );

        let tool = MergeTool::new(PathBuf::from("/nonexistent/icupkg"));
        let err = Pipeline::new(tool).run(&request).await.unwrap_err();

        assert!(matches!(err, Error::InvalidTarget { .. }));
        assert!(
            requested_paths(&server).await.is_empty(),
            "no HTTP request may be made when the precondition fails"
        );
    }

    #[tokio::test]
    async fn run_rejects_a_directory_as_target() {
        let server = MockServer::start().await;
        let target_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let request = request_for(target_dir.path().to_path_buf(), &server, work.path());

        let tool = MergeTool::new(PathBuf::from("/nonexistent/icupkg"));
        let err = Pipeline::new(tool).run(&request).await.unwrap_err();

        assert!(matches!(err, Error::InvalidTarget { .. }));
        assert!(requested_paths(&server).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_aborts_at_the_first_failed_download() {
        let server = MockServer::start().await;
        // First two resources succeed, the third 404s; the fourth is mounted
        // so a manifest-order bug would be visible as an extra request.
        mount_resource(&server, "metaZones.res").await;
        mount_resource(&server, "timezoneTypes.res").await;
        Mock::given(method("GET"))
            .and(path(format!("{RESOURCE_PREFIX}/windowsZones.res")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_resource(&server, "zoneinfo64.res").await;

        let target_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let tool_dir = TempDir::new().unwrap();
        let tool = fake_tool(tool_dir.path(), r#"echo "$2" >> calls.txt"#);

        let target = stub_target(target_dir.path());
        let request = request_for(target, &server, work.path());

        let err = Pipeline::new(tool).run(&request).await.unwrap_err();

        match err {
            Error::Remote { status, url } => {
                assert_eq!(status, 404);
                assert!(url.contains("windowsZones.res"));
            }
            other => panic!("expected Remote error, got: {other:?}"),
        }

        // Only the first three downloads were attempted
        let paths = requested_paths(&server).await;
        assert_eq!(paths.len(), 3);
        assert!(paths[2].ends_with("windowsZones.res"));
        assert!(!paths.iter().any(|p| p.ends_with("zoneinfo64.res")));

        // The failed resource was never merged and left no file behind
        let calls = std::fs::read_to_string(work.path().join("calls.txt")).unwrap();
        assert_eq!(
            calls.lines().count(),
            2,
            "merge tool must not run for the failed resource"
        );
        assert!(!work.path().join("windowsZones.res").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_aborts_when_the_merge_tool_fails_and_surfaces_its_stderr() {
        let server = MockServer::start().await;
        for name in REQUIRED_RESOURCES {
            mount_resource(&server, name).await;
        }

        let target_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let tool_dir = TempDir::new().unwrap();
        let tool = fake_tool(
            tool_dir.path(),
            "echo 'icupkg: bad resource format' >&2; exit 4",
        );

        let target = stub_target(target_dir.path());
        let request = request_for(target, &server, work.path());

        let err = Pipeline::new(tool).run(&request).await.unwrap_err();

        match err {
            Error::ExitCode { code, stderr, .. } => {
                assert_eq!(code, Some(4));
                assert!(stderr.contains("bad resource format"));
            }
            other => panic!("expected ExitCode error, got: {other:?}"),
        }

        // Only the first resource was ever downloaded
        assert_eq!(requested_paths(&server).await.len(), 1);
        // Its temp file was removed despite the failure
        assert!(!work.path().join("metaZones.res").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_succeeds_when_post_merge_cleanup_fails() {
        let server = MockServer::start().await;
        for name in REQUIRED_RESOURCES {
            mount_resource(&server, name).await;
        }

        let target_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let tool_dir = TempDir::new().unwrap();
        // The tool consumes its resource argument, so the pipeline's own
        // post-merge removal has nothing left to delete and fails.
        let tool = fake_tool(tool_dir.path(), r#"rm -f "$2"; echo "$2" >> calls.txt"#);

        let target = stub_target(target_dir.path());
        let request = request_for(target, &server, work.path());

        Pipeline::new(tool)
            .run(&request)
            .await
            .expect("a failed temp-file deletion after a successful merge is non-fatal");

        // Every resource was still merged despite the cleanup failures
        let calls = std::fs::read_to_string(work.path().join("calls.txt")).unwrap();
        assert_eq!(calls.lines().count(), REQUIRED_RESOURCES.len());
        assert_eq!(requested_paths(&server).await.len(), REQUIRED_RESOURCES.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_uses_an_owned_temp_dir_when_no_working_dir_is_given() {
        let server = MockServer::start().await;
        for name in REQUIRED_RESOURCES {
            mount_resource(&server, name).await;
        }

        let target_dir = TempDir::new().unwrap();
        let tool_dir = TempDir::new().unwrap();
        let tool = fake_tool(tool_dir.path(), "exit 0");

        let target = stub_target(target_dir.path());
        let mut request = PatchRequest::new(target);
        request.base_url = server.uri();
        // working_dir stays None

        Pipeline::new(tool).run(&request).await.unwrap();
        assert_eq!(requested_paths(&server).await.len(), 4);
    }
}
