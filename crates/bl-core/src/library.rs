use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{CoreError, CoreResult};
use crate::story::{IntentAction, Node, StoryManifest};

/// Manifest fields every published story must fill in.
pub const REQUIRED_MANIFEST_FIELDS: [&str; 8] = [
    "id",
    "title",
    "description",
    "authorId",
    "authorName",
    "startNode",
    "language",
    "date",
];

/// A story manifest with all of its nodes.
#[derive(Debug, Clone)]
pub struct StoryBundle {
    /// The story manifest.
    pub manifest: StoryManifest,
    /// Nodes keyed by id.
    pub nodes: BTreeMap<String, Node>,
}

impl StoryBundle {
    /// Create a bundle from a manifest and its nodes.
    pub fn new(manifest: StoryManifest, nodes: impl IntoIterator<Item = Node>) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        Self { manifest, nodes }
    }
}

/// A set of stories, keyed by story id.
#[derive(Debug, Clone, Default)]
pub struct StoryLibrary {
    stories: BTreeMap<String, StoryBundle>,
}

impl StoryLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a story.
    pub fn insert(&mut self, bundle: StoryBundle) {
        self.stories.insert(bundle.manifest.id.clone(), bundle);
    }

    /// Get a story by id.
    pub fn get(&self, story_id: &str) -> Option<&StoryBundle> {
        self.stories.get(story_id)
    }

    /// Iterate over all stories in id order.
    pub fn stories(&self) -> impl Iterator<Item = &StoryBundle> {
        self.stories.values()
    }

    /// Number of stories.
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    /// True when the library holds no stories.
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Load every story under `root`.
    ///
    /// Expects `<root>/<story>/manifest.json` and `<root>/<story>/nodes/*.json`.
    /// Entries that are not directories are skipped. Any unreadable or
    /// malformed file aborts the load; use [`StoryLibrary::validate_dir`] to
    /// collect problems instead.
    pub fn load_dir(root: &Path) -> CoreResult<Self> {
        let mut library = Self::new();
        for story_dir in story_dirs(root)? {
            let manifest: StoryManifest = read_json(&story_dir.join("manifest.json"))?;
            let mut nodes = Vec::new();
            for path in node_files(&story_dir.join("nodes"))? {
                nodes.push(read_json::<Node>(&path)?);
            }
            library.insert(StoryBundle::new(manifest, nodes));
        }
        Ok(library)
    }

    /// Check every story under `root` and report all problems found.
    pub fn validate_dir(root: &Path) -> CoreResult<Vec<StoryIssue>> {
        let mut issues = Vec::new();
        for story_dir in story_dirs(root)? {
            let story = story_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            validate_story(&story_dir, &story, &mut issues);
        }
        Ok(issues)
    }
}

/// What is wrong with a story on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// `manifest.json` is absent.
    MissingManifest,
    /// Required manifest fields are absent or empty.
    MissingManifestFields(Vec<String>),
    /// A file is not valid JSON.
    InvalidJson {
        /// File name relative to the story.
        file: String,
        /// Parser message.
        message: String,
    },
    /// The `nodes` directory is absent.
    MissingNodesDir,
    /// A node file has no `id`.
    NodeWithoutId {
        /// File name.
        file: String,
    },
    /// A node file name does not match its id.
    FilenameMismatch {
        /// File name.
        file: String,
        /// Id found inside.
        id: String,
    },
    /// A node has neither text nor conditional texts.
    NodeWithoutText {
        /// File name.
        file: String,
    },
    /// The manifest start node does not exist.
    MissingStartNode(String),
    /// A transition points at a node that does not exist.
    DanglingTarget {
        /// Node holding the intent.
        node: String,
        /// Intent id.
        intent: String,
        /// Missing target.
        target: String,
    },
}

/// A problem found while validating a story directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryIssue {
    /// Story directory name.
    pub story: String,
    /// The problem.
    pub kind: IssueKind,
}

impl fmt::Display for StoryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let story = &self.story;
        match &self.kind {
            IssueKind::MissingManifest => write!(f, "story '{story}' is missing manifest.json"),
            IssueKind::MissingManifestFields(fields) => write!(
                f,
                "story '{story}' manifest is missing fields: {}",
                fields.join(", ")
            ),
            IssueKind::InvalidJson { file, message } => {
                write!(f, "story '{story}' file '{file}' is invalid JSON: {message}")
            }
            IssueKind::MissingNodesDir => write!(f, "story '{story}' is missing 'nodes' directory"),
            IssueKind::NodeWithoutId { file } => {
                write!(f, "story '{story}' node '{file}' is missing 'id'")
            }
            IssueKind::FilenameMismatch { file, id } => write!(
                f,
                "story '{story}' node filename '{file}' does not match id '{id}'"
            ),
            IssueKind::NodeWithoutText { file } => write!(
                f,
                "story '{story}' node '{file}' is missing 'text' (and has no conditionals)"
            ),
            IssueKind::MissingStartNode(start) => write!(
                f,
                "story '{story}' manifest startNode '{start}' does not exist in nodes"
            ),
            IssueKind::DanglingTarget {
                node,
                intent,
                target,
            } => write!(
                f,
                "story '{story}' intent '{intent}' in node '{node}' targets unknown node '{target}'"
            ),
        }
    }
}

fn validate_story(dir: &Path, story: &str, issues: &mut Vec<StoryIssue>) {
    let mut report = |kind| {
        issues.push(StoryIssue {
            story: story.to_string(),
            kind,
        })
    };

    let manifest_path = dir.join("manifest.json");
    if !manifest_path.is_file() {
        report(IssueKind::MissingManifest);
        return;
    }

    let manifest: serde_json::Value = match read_json(&manifest_path) {
        Ok(value) => value,
        Err(e) => {
            report(IssueKind::InvalidJson {
                file: "manifest.json".to_string(),
                message: error_message(&e),
            });
            return;
        }
    };

    let missing: Vec<String> = REQUIRED_MANIFEST_FIELDS
        .iter()
        .filter(|field| !is_filled(manifest.get(**field)))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        report(IssueKind::MissingManifestFields(missing));
    }

    let nodes_dir = dir.join("nodes");
    if !nodes_dir.is_dir() {
        report(IssueKind::MissingNodesDir);
        return;
    }

    let files = match node_files(&nodes_dir) {
        Ok(files) => files,
        Err(e) => {
            report(IssueKind::InvalidJson {
                file: "nodes".to_string(),
                message: e.to_string(),
            });
            return;
        }
    };

    let mut node_ids = BTreeSet::new();
    let mut nodes = Vec::new();
    for path in files {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let value: serde_json::Value = match read_json(&path) {
            Ok(value) => value,
            Err(e) => {
                report(IssueKind::InvalidJson {
                    file,
                    message: error_message(&e),
                });
                continue;
            }
        };

        match value.get("id").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
            Some(id) => {
                node_ids.insert(id.to_string());
                if file != format!("{id}.json") {
                    report(IssueKind::FilenameMismatch {
                        file: file.clone(),
                        id: id.to_string(),
                    });
                }
            }
            None => report(IssueKind::NodeWithoutId { file: file.clone() }),
        }

        let has_text = is_filled(value.get("text"));
        let has_conditionals = value
            .get("text_conditionals")
            .and_then(|v| v.as_array())
            .is_some_and(|a| !a.is_empty());
        if !has_text && !has_conditionals {
            report(IssueKind::NodeWithoutText { file: file.clone() });
        }

        match serde_json::from_value::<Node>(value) {
            Ok(node) => nodes.push(node),
            Err(e) => report(IssueKind::InvalidJson {
                file,
                message: e.to_string(),
            }),
        }
    }

    if let Some(start) = manifest.get("startNode").and_then(|v| v.as_str())
        && !start.is_empty()
        && !node_ids.contains(start)
    {
        report(IssueKind::MissingStartNode(start.to_string()));
    }

    for node in &nodes {
        for intent in &node.intents {
            if intent.action == Some(IntentAction::Transition)
                && let Some(target) = &intent.target
                && !node_ids.contains(target)
            {
                report(IssueKind::DanglingTarget {
                    node: node.id.clone(),
                    intent: intent.id.clone(),
                    target: target.clone(),
                });
            }
        }
    }
}

fn is_filled(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Bool(b)) => *b,
        Some(_) => true,
    }
}

fn error_message(error: &CoreError) -> String {
    match error {
        CoreError::Json { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}

fn story_dirs(root: &Path) -> CoreResult<Vec<PathBuf>> {
    let entries = fs::read_dir(root).map_err(|source| CoreError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn node_files(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| CoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let text = fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}
