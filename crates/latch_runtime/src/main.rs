//! Latch Engine Runtime
//!
//! Boots the asset system, requests every resource in the manifest and drives
//! the registry once per frame until they have all settled.

use anyhow::{bail, Context, Result};
use clap::Parser;
use latch_asset::{
    AssetSettings, Binary, Model, ResourceEvent, ResourceHandle, ResourceId, ResourceRegistry,
    Texture,
};
use latch_core::jobs::WorkerPool;
use latch_core::time::FrameClock;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Parser, Debug)]
#[command(name = "latch", about = "Latch Engine runtime", version)]
struct Args {
    /// Asset settings (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the resource root from the settings.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Stop after this many ticks instead of waiting for every resource.
    #[arg(long)]
    ticks: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BootKind {
    Model,
    Texture,
    Binary,
}

/// Manifest categories with a dedicated resource kind, matched ignoring case.
/// Anything else loads as raw bytes.
const CATEGORY_KINDS: &[(&str, BootKind)] = &[
    ("models", BootKind::Model),
    ("meshes", BootKind::Model),
    ("textures", BootKind::Texture),
    ("images", BootKind::Texture),
    ("binaries", BootKind::Binary),
    ("shaders", BootKind::Binary),
    ("configs", BootKind::Binary),
];

fn kind_for(category: &str) -> BootKind {
    CATEGORY_KINDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|&(_, kind)| kind)
        .unwrap_or_else(|| {
            tracing::warn!(category, "unknown resource category, loading as binary");
            BootKind::Binary
        })
}

/// Keeps one boot-time reference per catalog entry.
enum BootHandle {
    Model(ResourceHandle<Model>),
    Texture(ResourceHandle<Texture>),
    Binary(ResourceHandle<Binary>),
}

impl BootHandle {
    fn acquire(registry: &ResourceRegistry, id: ResourceId, category: &str) -> Result<Self> {
        let handle = match kind_for(category) {
            BootKind::Model => BootHandle::Model(ResourceHandle::new(registry, id)?),
            BootKind::Texture => BootHandle::Texture(ResourceHandle::new(registry, id)?),
            BootKind::Binary => BootHandle::Binary(ResourceHandle::new(registry, id)?),
        };
        Ok(handle)
    }

    fn is_loaded(&self) -> bool {
        match self {
            BootHandle::Model(handle) => handle.is_loaded(),
            BootHandle::Texture(handle) => handle.is_loaded(),
            BootHandle::Binary(handle) => handle.is_loaded(),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RunSummary {
    ticks: u64,
    loaded: usize,
    failed: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    tracing::info!("Latch Engine v{}", latch_core::VERSION);

    let mut settings = match &args.config {
        Some(path) => AssetSettings::load(path)?,
        None => AssetSettings::default(),
    };
    if let Some(root) = args.root {
        settings.resource_root = root;
    }

    let summary = run(settings, args.ticks)?;
    tracing::info!(
        ticks = summary.ticks,
        loaded = summary.loaded,
        failed = summary.failed,
        "runtime finished"
    );
    if summary.failed > 0 {
        bail!("{} resource(s) failed to load", summary.failed);
    }
    Ok(())
}

fn run(settings: AssetSettings, max_ticks: Option<u64>) -> Result<RunSummary> {
    let pool = Arc::new(
        WorkerPool::new(settings.worker_threads).context("failed to start worker pool")?,
    );
    let registry = ResourceRegistry::new(settings, Arc::clone(&pool));
    let events = registry.subscribe();
    registry.attach().context("failed to attach resource registry")?;

    let mut pending = HashSet::new();
    let mut handles = Vec::new();
    for descriptor in registry.catalog() {
        handles.push(BootHandle::acquire(&registry, descriptor.id, &descriptor.category)?);
        pending.insert(descriptor.id);
    }
    tracing::info!(resources = handles.len(), "boot resources requested");

    let mut summary = RunSummary::default();
    let mut clock = FrameClock::new();
    loop {
        let delta = clock.tick();
        if let Err(err) = registry.update(delta) {
            // Already broadcast; the event loop below counts it.
            tracing::debug!(error = %err, "tick reported a failure");
        }

        for event in events.try_iter() {
            if pending.remove(&event.id()) {
                match event {
                    ResourceEvent::Loaded(_) => summary.loaded += 1,
                    ResourceEvent::Failed { .. } => summary.failed += 1,
                }
            }
        }

        let done = match max_ticks {
            Some(limit) => clock.tick_count() >= limit,
            None => pending.is_empty(),
        };
        if done {
            break;
        }
        thread::sleep(clock.remaining_in_frame());
    }
    summary.ticks = clock.tick_count();

    let resident = handles.iter().filter(|handle| handle.is_loaded()).count();
    tracing::debug!(resident, "releasing boot resources");
    drop(handles);
    registry.detach();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn categories_map_to_kinds_ignoring_case() {
        assert_eq!(kind_for("models"), BootKind::Model);
        assert_eq!(kind_for("Textures"), BootKind::Texture);
        assert_eq!(kind_for("IMAGES"), BootKind::Texture);
        assert_eq!(kind_for("shaders"), BootKind::Binary);
        assert_eq!(kind_for("sounds"), BootKind::Binary);
    }

    #[test]
    fn capitalized_texture_category_decodes_as_texture() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::new(1, 1).save(dir.path().join("dot.png")).unwrap();
        fs::write(
            dir.path().join("Manifest.json"),
            r#"{ "Textures": [ { "uuid": 3, "name": "dot", "path": "dot.png" } ] }"#,
        )
        .unwrap();

        let mut settings = AssetSettings::with_root(dir.path());
        settings.container = None;
        let pool = Arc::new(WorkerPool::new(1).unwrap());
        let registry = ResourceRegistry::new(settings, pool);
        registry.attach().unwrap();

        let descriptor = registry.descriptor(ResourceId::from_raw(3)).unwrap();
        let handle = BootHandle::acquire(&registry, descriptor.id, &descriptor.category).unwrap();
        assert!(matches!(handle, BootHandle::Texture(_)));
    }

    #[test]
    fn boots_every_catalog_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("shaders")).unwrap();
        fs::write(dir.path().join("shaders/sky.vert"), b"void main() {}").unwrap();
        fs::write(
            dir.path().join("tri.obj"),
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("Manifest.json"),
            r#"{
                "models": [ { "uuid": 1, "name": "tri", "path": "tri" } ],
                "shaders": [ { "uuid": 2, "name": "sky", "path": "shaders/sky.vert" } ]
            }"#,
        )
        .unwrap();

        let mut settings = AssetSettings::with_root(dir.path());
        settings.container = None;
        settings.worker_threads = 2;

        let summary = run(settings, None).unwrap();
        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.ticks >= 2);
    }

    #[test]
    fn missing_resource_counts_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Manifest.json"),
            r#"{ "textures": [ { "uuid": 9, "name": "gone", "path": "gone.png" } ] }"#,
        )
        .unwrap();

        let mut settings = AssetSettings::with_root(dir.path());
        settings.container = None;
        settings.worker_threads = 1;

        let summary = run(settings, None).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.loaded, 0);
    }
}
