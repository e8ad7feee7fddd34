// SPDX-License-Identifier: GPL-3.0-only

//! Access-mode aware dispatch
//!
//! A [`Console`] owns the creator matching the current [`AccessMode`] and
//! answers whether a failure is worth retrying under another mode. It never
//! retries on its own; switching modes is always the caller's decision.

use std::path::{Path, PathBuf};

use fileman_sys::{ShellRunner, SuperuserWrapper};
use fileman_types::{AccessMode, StorageVolume, is_inside_volume};
use serde::{Deserialize, Serialize};

use crate::error::{ExecError, Result};
use crate::executable::{BoxedExecutable, ExecutableCreator};
use crate::native::NativeCreator;
use crate::paths::real_path;
use crate::shell::ShellCreator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// POSIX shell used by the shell creator
    pub shell: PathBuf,
    /// Wrapper that elevates scripts in root mode
    pub superuser: SuperuserWrapper,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
            superuser: SuperuserWrapper::default(),
        }
    }
}

pub struct Console {
    mode: AccessMode,
    settings: ConsoleSettings,
    creator: Box<dyn ExecutableCreator>,
    /// Unprivileged shell creator for operations the native one lacks
    fallback: Option<ShellCreator>,
    confined_to: Option<Vec<StorageVolume>>,
}

impl Console {
    pub fn new(mode: AccessMode, settings: ConsoleSettings) -> Self {
        let (creator, fallback): (Box<dyn ExecutableCreator>, Option<ShellCreator>) = match mode {
            AccessMode::Safe | AccessMode::Prompt => (
                Box::new(NativeCreator::new()),
                Some(ShellCreator::new(ShellRunner::new(&settings.shell))),
            ),
            AccessMode::Root => (
                Box::new(ShellCreator::new(ShellRunner::privileged(
                    &settings.shell,
                    settings.superuser.clone(),
                ))),
                None,
            ),
        };

        tracing::debug!(%mode, backend = ?creator.backend(), "console ready");
        Self {
            mode,
            settings,
            creator,
            fallback,
            confined_to: None,
        }
    }

    /// Same settings and confinement, different mode.
    pub fn with_mode(self, mode: AccessMode) -> Self {
        let confined_to = self.confined_to;
        let mut console = Self::new(mode, self.settings);
        console.confined_to = confined_to;
        console
    }

    /// Reject paths outside `volumes` from now on.
    pub fn confine(mut self, mut volumes: Vec<StorageVolume>) -> Self {
        for volume in &mut volumes {
            if let Ok(resolved) = real_path(&volume.mount_path) {
                volume.mount_path = resolved;
            }
        }
        self.confined_to = Some(volumes);
        self
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn settings(&self) -> &ConsoleSettings {
        &self.settings
    }

    pub fn creator(&self) -> &dyn ExecutableCreator {
        self.creator.as_ref()
    }

    /// Build an executable with the mode's creator.
    ///
    /// Outside root mode, operations the in-process creator does not
    /// implement are built by the shell creator under the caller's own
    /// identity. Nothing is elevated implicitly.
    pub fn build<T, F>(&self, factory: F) -> Result<BoxedExecutable<T>>
    where
        F: Fn(&dyn ExecutableCreator) -> Result<BoxedExecutable<T>>,
    {
        match factory(self.creator()) {
            Err(ExecError::NotImplemented(operation)) => match &self.fallback {
                Some(shell) => {
                    tracing::debug!("{operation} not available in-process, using the shell");
                    factory(shell)
                }
                None => Err(ExecError::NotImplemented(operation)),
            },
            built => built,
        }
    }

    /// Mode worth switching to after `error`, if any.
    pub fn escalation_hint(&self, error: &ExecError) -> Option<AccessMode> {
        (self.mode == AccessMode::Prompt && error.needs_elevation()).then_some(AccessMode::Root)
    }

    /// Fail with `InvalidArgument` for paths outside the confinement volumes.
    pub fn check_path(&self, path: &Path) -> Result<()> {
        let Some(volumes) = &self.confined_to else {
            return Ok(());
        };

        let resolved = real_path(path)?;
        if is_inside_volume(&resolved, volumes) {
            Ok(())
        } else {
            Err(ExecError::InvalidArgument(format!(
                "{} resolves to {}, outside the accessible volumes",
                path.display(),
                resolved.display()
            )))
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(AccessMode::default(), ConsoleSettings::default())
    }
}
