use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::paths;
use crate::resolve;

// ═══════════════════════════════════════════════════════════════════════════════
//  Known project and item types
// ═══════════════════════════════════════════════════════════════════════════════

/// Solution folder: a grouping node with no project file behind it.
pub const PROJECT_TYPE_FOLDER: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";
/// Native makefile-style (NMake / `.vcxproj`) project.
pub const PROJECT_TYPE_MAKEFILE: &str = "8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942";
/// Managed-language (`.csproj`) project.
pub const PROJECT_TYPE_MANAGED: &str = "FAE04EC0-301F-11D3-BF4B-00C04F79EFBC";

pub const ITEM_TYPE_CL_COMPILE: &str = "ClCompile";
pub const ITEM_TYPE_CL_INCLUDE: &str = "ClInclude";
pub const ITEM_TYPE_COMPILE: &str = "Compile";

/// Item types whose includes are source files owned by the project.
pub const SOURCE_ITEM_TYPES: [&str; 3] =
    [ITEM_TYPE_CL_COMPILE, ITEM_TYPE_CL_INCLUDE, ITEM_TYPE_COMPILE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Folder,
    Makefile,
    Managed,
    Other,
}

impl ProjectKind {
    pub fn from_type_id(type_id: &str) -> Self {
        if type_id.eq_ignore_ascii_case(PROJECT_TYPE_FOLDER) {
            Self::Folder
        } else if type_id.eq_ignore_ascii_case(PROJECT_TYPE_MAKEFILE) {
            Self::Makefile
        } else if type_id.eq_ignore_ascii_case(PROJECT_TYPE_MANAGED) {
            Self::Managed
        } else {
            Self::Other
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Makefile => "makefile",
            Self::Managed => "managed",
            Self::Other => "other",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Items and properties
// ═══════════════════════════════════════════════════════════════════════════════

/// Something that lives in a [`Group`] and can resolve its `$(Var)`
/// references against an environment.
pub trait Member: Clone {
    fn resolve(&self, env: &Environment) -> Self;
}

/// One item element, e.g. `<ClCompile Include="src\main.cpp">`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectItem {
    /// Raw `Include` attribute (empty when absent).
    pub include: String,
    /// Local tag name (`ClCompile`, `Compile`, `None`, …).
    pub item_type: String,
    /// Child element local name → text.
    pub metadata: HashMap<String, String>,
}

impl ProjectItem {
    pub fn new(include: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            item_type: item_type.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn metadata(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }

    pub fn is_source(&self) -> bool {
        SOURCE_ITEM_TYPES.contains(&self.item_type.as_str())
    }
}

impl Member for ProjectItem {
    fn resolve(&self, env: &Environment) -> Self {
        Self {
            include: resolve::resolve(&self.include, env),
            item_type: self.item_type.clone(),
            metadata: self
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), resolve::resolve(v, env)))
                .collect(),
        }
    }
}

/// One property element, e.g. `<ConfigurationType>Makefile</ConfigurationType>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProperty {
    pub name: String,
    pub value: String,
}

impl ProjectProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Member for ProjectProperty {
    fn resolve(&self, env: &Environment) -> Self {
        Self {
            name: self.name.clone(),
            value: resolve::resolve(&self.value, env),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Conditional groups
// ═══════════════════════════════════════════════════════════════════════════════

/// A labeled collection of members, split into an unconditional part and
/// sub-groups that only apply when their raw `Condition` holds.
///
/// All `<ItemGroup>` (or `<PropertyGroup>`) elements sharing a `Label` end up
/// in the same group; conditional elements with the same condition string end
/// up in the same sub-group, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group<M> {
    /// `Label` attribute; `None` is the project's default group.
    pub label: Option<String>,
    pub members: Vec<M>,
    /// Raw condition → sub-group, in declaration order.
    pub conditionals: Vec<(String, Group<M>)>,
}

pub type ItemGroup = Group<ProjectItem>;
pub type PropertyGroup = Group<ProjectProperty>;

impl<M> Group<M> {
    pub fn new(label: Option<String>) -> Self {
        Self {
            label,
            members: Vec::new(),
            conditionals: Vec::new(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn push(&mut self, member: M) {
        self.members.push(member);
    }

    pub fn conditional(&self, condition: &str) -> Option<&Self> {
        self.conditionals
            .iter()
            .find(|(c, _)| c == condition)
            .map(|(_, g)| g)
    }

    /// The sub-group for `condition`, created on first use.
    pub fn conditional_mut(&mut self, condition: &str) -> &mut Self {
        let index = match self.conditionals.iter().position(|(c, _)| c == condition) {
            Some(index) => index,
            None => {
                self.conditionals
                    .push((condition.to_string(), Self::new(self.label.clone())));
                self.conditionals.len() - 1
            }
        };
        &mut self.conditionals[index].1
    }

    /// `true` when the group has no conditional sub-groups.
    pub fn is_flat(&self) -> bool {
        self.conditionals.is_empty()
    }
}

impl<M: Member> Group<M> {
    /// Flatten this group for `env`.
    ///
    /// The result holds the resolved unconditional members followed by the
    /// resolved members of every sub-group whose condition is true, in
    /// declaration order. Nothing is de-duplicated.
    pub fn resolve(&self, env: &Environment) -> Result<Self> {
        let mut resolved = Self::new(self.label.clone());
        resolved.collapse(self, env)?;
        Ok(resolved)
    }

    fn collapse(&mut self, source: &Self, env: &Environment) -> Result<()> {
        self.members
            .extend(source.members.iter().map(|m| m.resolve(env)));
        for (condition, child) in &source.conditionals {
            if resolve::evaluate(condition, env)? {
                self.collapse(child, env)?;
            }
        }
        Ok(())
    }
}

impl Group<ProjectItem> {
    pub fn items(&self) -> &[ProjectItem] {
        &self.members
    }

    pub fn items_of_type<'a>(&'a self, item_type: &'a str) -> impl Iterator<Item = &'a ProjectItem> {
        self.members.iter().filter(move |i| i.item_type == item_type)
    }

    pub fn items_of_types<'a>(
        &'a self,
        item_types: &'a [&str],
    ) -> impl Iterator<Item = &'a ProjectItem> {
        self.members
            .iter()
            .filter(move |i| item_types.contains(&i.item_type.as_str()))
    }

    /// Items of one of the [`SOURCE_ITEM_TYPES`].
    pub fn source_items(&self) -> impl Iterator<Item = &ProjectItem> {
        self.items_of_types(&SOURCE_ITEM_TYPES)
    }
}

impl Group<ProjectProperty> {
    pub fn properties(&self) -> &[ProjectProperty] {
        &self.members
    }

    /// Value of the **first** property called `name`.
    ///
    /// After [`resolve`](Group::resolve), unconditional values come before
    /// conditional ones, so a base value shadows a later conditional value of
    /// the same name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ProjectContent – the parsed project file
// ═══════════════════════════════════════════════════════════════════════════════

/// The item and property groups of one project file, keyed by label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectContent {
    pub item_groups: Vec<ItemGroup>,
    pub property_groups: Vec<PropertyGroup>,
}

impl ProjectContent {
    /// Parse project XML. `origin` is only used in error messages.
    pub fn parse(source: &str, origin: &Path) -> Result<Self> {
        let doc = roxmltree::Document::parse(source).map_err(|source| Error::Xml {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::from_root(doc.root_element(), origin)
    }

    /// Load a project file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&source, path)
    }

    fn from_root(root: roxmltree::Node, origin: &Path) -> Result<Self> {
        let root_name = root.tag_name().name();
        if root_name != "Project" {
            return Err(Error::UnexpectedRoot {
                path: origin.to_path_buf(),
                found: root_name.to_string(),
            });
        }

        let mut content = Self::default();

        for child in root.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "ItemGroup" => {
                    let group = target_group(&mut content.item_groups, &child);
                    for item_node in child.children().filter(|n| n.is_element()) {
                        group.push(parse_item(&item_node));
                    }
                }
                "PropertyGroup" => {
                    let group = target_group(&mut content.property_groups, &child);
                    for prop_node in child.children().filter(|n| n.is_element()) {
                        group.push(ProjectProperty {
                            name: prop_node.tag_name().name().to_string(),
                            value: prop_node.text().unwrap_or("").to_string(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(content)
    }

    pub fn item_group(&self, label: Option<&str>) -> Option<&ItemGroup> {
        self.item_groups.iter().find(|g| g.label() == label)
    }

    pub fn property_group(&self, label: Option<&str>) -> Option<&PropertyGroup> {
        self.property_groups.iter().find(|g| g.label() == label)
    }

    /// Resolve every group against `env`.
    pub fn resolve(&self, env: &Environment) -> Result<Self> {
        Ok(Self {
            item_groups: self
                .item_groups
                .iter()
                .map(|g| g.resolve(env))
                .collect::<Result<_>>()?,
            property_groups: self
                .property_groups
                .iter()
                .map(|g| g.resolve(env))
                .collect::<Result<_>>()?,
        })
    }
}

/// Find (or create) the group for `node`'s `Label`, then descend into the
/// conditional sub-group if `node` carries a non-empty `Condition`.
fn target_group<'g, M>(groups: &'g mut Vec<Group<M>>, node: &roxmltree::Node) -> &'g mut Group<M> {
    let label = node.attribute("Label");
    let index = match groups.iter().position(|g| g.label() == label) {
        Some(index) => index,
        None => {
            debug!(label = ?label, tag = node.tag_name().name(), "adding group");
            groups.push(Group::new(label.map(String::from)));
            groups.len() - 1
        }
    };
    let group = &mut groups[index];
    match node.attribute("Condition").filter(|c| !c.is_empty()) {
        Some(condition) => group.conditional_mut(condition),
        None => group,
    }
}

fn parse_item(node: &roxmltree::Node) -> ProjectItem {
    ProjectItem {
        include: node.attribute("Include").unwrap_or("").to_string(),
        item_type: node.tag_name().name().to_string(),
        metadata: node
            .children()
            .filter(|n| n.is_element())
            .map(|m| {
                (
                    m.tag_name().name().to_string(),
                    m.text().unwrap_or("").to_string(),
                )
            })
            .collect(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Project – a workspace entry with lazily loaded content
// ═══════════════════════════════════════════════════════════════════════════════

/// A project declared in a workspace.
///
/// The project file is not read until one of the group accessors is called;
/// the parsed [`ProjectContent`] is then kept for the lifetime of the value
/// (and persisted along with the workspace by the cache).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project type id, without braces.
    pub type_id: String,
    pub name: String,
    /// Path as declared in the workspace, relative to the workspace directory.
    pub path: String,
    /// Unique project id, without braces.
    pub id: String,
    abs_path: PathBuf,
    #[serde(with = "lazy_content")]
    content: OnceCell<ProjectContent>,
}

impl Project {
    /// Declare a project whose `path` is relative to `workspace_dir`.
    pub fn new(
        type_id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        id: impl Into<String>,
        workspace_dir: &Path,
    ) -> Self {
        let path = path.into();
        Self {
            type_id: type_id.into(),
            name: name.into(),
            abs_path: paths::join_declared(workspace_dir, &path),
            path,
            id: id.into(),
            content: OnceCell::new(),
        }
    }

    /// Attach already-parsed content, skipping the on-disk load.
    pub fn with_content(self, content: ProjectContent) -> Self {
        Self {
            content: OnceCell::from(content),
            ..self
        }
    }

    pub fn kind(&self) -> ProjectKind {
        ProjectKind::from_type_id(&self.type_id)
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == ProjectKind::Folder
    }

    /// Absolute path of the project file.
    pub fn abs_path(&self) -> &Path {
        &self.abs_path
    }

    /// Directory containing the project file.
    pub fn dir(&self) -> &Path {
        self.abs_path.parent().unwrap_or(Path::new(""))
    }

    pub fn is_loaded(&self) -> bool {
        self.content.get().is_some()
    }

    /// The parsed project, loading it on first access.
    pub fn content(&self) -> Result<&ProjectContent> {
        if let Some(content) = self.content.get() {
            return Ok(content);
        }
        let content = self.load()?;
        Ok(self.content.get_or_init(|| content))
    }

    fn load(&self) -> Result<ProjectContent> {
        if self.is_folder() {
            debug!(project = %self.name, "skipping folder project");
            return Ok(ProjectContent::default());
        }
        debug!(
            project = %self.name,
            path = %self.abs_path.display(),
            "loading project"
        );
        ProjectContent::from_file(&self.abs_path)
    }

    pub fn item_groups(&self) -> Result<&[ItemGroup]> {
        Ok(&self.content()?.item_groups)
    }

    pub fn property_groups(&self) -> Result<&[PropertyGroup]> {
        Ok(&self.content()?.property_groups)
    }

    pub fn item_group(&self, label: Option<&str>) -> Result<Option<&ItemGroup>> {
        Ok(self.content()?.item_group(label))
    }

    pub fn property_group(&self, label: Option<&str>) -> Result<Option<&PropertyGroup>> {
        Ok(self.content()?.property_group(label))
    }

    /// The item group for `label`, flattened for `env`.
    pub fn resolved_item_group(
        &self,
        label: Option<&str>,
        env: &Environment,
    ) -> Result<Option<ItemGroup>> {
        let Some(group) = self.item_group(label)? else {
            return Ok(None);
        };
        debug!(project = %self.name, label = ?label, "resolving item group");
        group.resolve(env).map(Some)
    }

    /// The property group for `label`, flattened for `env`.
    pub fn resolved_property_group(
        &self,
        label: Option<&str>,
        env: &Environment,
    ) -> Result<Option<PropertyGroup>> {
        let Some(group) = self.property_group(label)? else {
            return Ok(None);
        };
        debug!(project = %self.name, label = ?label, "resolving property group");
        group.resolve(env).map(Some)
    }

    pub fn default_item_group(&self) -> Result<Option<&ItemGroup>> {
        self.item_group(None)
    }

    pub fn default_property_group(&self) -> Result<Option<&PropertyGroup>> {
        self.property_group(None)
    }

    pub fn resolved_default_item_group(&self, env: &Environment) -> Result<Option<ItemGroup>> {
        self.resolved_item_group(None, env)
    }

    pub fn resolved_default_property_group(
        &self,
        env: &Environment,
    ) -> Result<Option<PropertyGroup>> {
        self.resolved_property_group(None, env)
    }

    /// Replace every group with its version flattened for `env`.
    pub fn resolve(&mut self, env: &Environment) -> Result<()> {
        let resolved = self.content()?.resolve(env)?;
        self.content = OnceCell::from(resolved);
        Ok(())
    }

    /// Absolute path of an item's include, relative to the project directory.
    pub fn item_abs_path(&self, item: &ProjectItem) -> PathBuf {
        paths::join_declared(self.dir(), &item.include)
    }

    /// Absolute paths of the source items in the default item group.
    pub fn source_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .default_item_group()?
            .map(|g| g.source_items().map(|i| self.item_abs_path(i)).collect())
            .unwrap_or_default())
    }
}

/// Persist loaded content as `Option<ProjectContent>`.
mod lazy_content {
    use std::cell::OnceCell;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ProjectContent;

    pub fn serialize<S: Serializer>(
        cell: &OnceCell<ProjectContent>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        cell.get().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OnceCell<ProjectContent>, D::Error> {
        let content = Option::<ProjectContent>::deserialize(deserializer)?;
        Ok(content.map_or_else(OnceCell::new, OnceCell::from))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const NMAKE_PROJECT: &str = include_str!("../testdata/App/App.vcxproj");

    fn parse_fixture() -> ProjectContent {
        ProjectContent::parse(NMAKE_PROJECT, Path::new("App.vcxproj")).unwrap()
    }

    fn debug_x64() -> Environment {
        Environment::for_configuration("Debug", "x64")
    }

    // ── Parsing ──────────────────────────────────────────────────────────

    #[test]
    fn parse_groups_by_label() {
        let content = parse_fixture();
        let labels: Vec<Option<&str>> =
            content.property_groups.iter().map(|g| g.label()).collect();
        assert_eq!(labels, vec![Some("Globals"), Some("Configuration"), None]);

        let item_labels: Vec<Option<&str>> =
            content.item_groups.iter().map(|g| g.label()).collect();
        assert_eq!(item_labels, vec![Some("ProjectConfigurations"), None]);
    }

    #[test]
    fn parse_items_and_metadata() {
        let content = parse_fixture();
        let group = content.item_group(None).unwrap();
        let first = &group.items()[0];
        assert_eq!(first.item_type, "ClCompile");
        assert_eq!(first.include, "src\\main.cpp");
        assert_eq!(
            first.metadata("AdditionalIncludeDirectories"),
            Some("$(ProjectDir)extra")
        );
        assert_eq!(group.items_of_type("ClInclude").count(), 1);
        assert_eq!(group.items_of_type("None").count(), 1);
        assert_eq!(group.source_items().count(), 3);
    }

    #[test]
    fn parse_conditional_property_groups_share_a_sub_group() {
        let content = parse_fixture();
        let config = content.property_group(Some("Configuration")).unwrap();
        assert!(config.members.is_empty());
        assert_eq!(config.conditionals.len(), 2);

        let debug = config
            .conditional("'$(Configuration)|$(Platform)'=='Debug|x64'")
            .unwrap();
        assert_eq!(debug.get("ConfigurationType"), Some("Makefile"));
        assert_eq!(debug.label(), Some("Configuration"));
    }

    #[test]
    fn parse_without_namespace() {
        let xml = r#"<Project><PropertyGroup><A>1</A></PropertyGroup></Project>"#;
        let content = ProjectContent::parse(xml, Path::new("p.proj")).unwrap();
        assert_eq!(content.property_group(None).unwrap().get("A"), Some("1"));
    }

    #[test]
    fn parse_empty_elements_and_attributes() {
        let xml = r#"<Project>
            <ItemGroup Condition=""><None /></ItemGroup>
            <PropertyGroup><Empty /></PropertyGroup>
        </Project>"#;
        let content = ProjectContent::parse(xml, Path::new("p.proj")).unwrap();
        let items = content.item_group(None).unwrap();
        assert!(items.is_flat());
        assert_eq!(items.items()[0].include, "");
        assert_eq!(content.property_group(None).unwrap().get("Empty"), Some(""));
    }

    #[test]
    fn parse_rejects_unexpected_root() {
        let xml = "<Solution><ItemGroup /></Solution>";
        let err = ProjectContent::parse(xml, Path::new("bad.proj")).unwrap_err();
        match err {
            Error::UnexpectedRoot { found, .. } => assert_eq!(found, "Solution"),
            other => panic!("expected UnexpectedRoot, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_invalid_xml() {
        let result = ProjectContent::parse("<Project>", Path::new("bad.proj"));
        assert!(matches!(result, Err(Error::Xml { .. })));
    }

    // ── Resolution ───────────────────────────────────────────────────────

    #[test]
    fn resolve_flat_group_matches_direct_substitution() {
        let mut group = PropertyGroup::new(None);
        group.push(ProjectProperty::new("OutDir", "bin\\$(Configuration)\\"));
        group.push(ProjectProperty::new("Plain", "value"));

        for env in [Environment::new(), debug_x64()] {
            let resolved = group.resolve(&env).unwrap();
            let expected: Vec<String> = group
                .properties()
                .iter()
                .map(|p| resolve::resolve(&p.value, &env))
                .collect();
            let actual: Vec<String> =
                resolved.properties().iter().map(|p| p.value.clone()).collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn resolve_keeps_base_value_first() {
        // Known quirk: the conditional override is appended after the base
        // value and `get` returns the first match, i.e. the base value.
        let mut group = PropertyGroup::new(None);
        group.push(ProjectProperty::new("P", "1"));
        group
            .conditional_mut("'$(Config)'=='Debug'")
            .push(ProjectProperty::new("P", "2"));

        let env: Environment = [("Config", "Debug")].into_iter().collect();
        let resolved = group.resolve(&env).unwrap();
        let values: Vec<&str> = resolved.properties().iter().map(|p| p.value.as_str()).collect();
        assert_eq!(values, vec!["1", "2"]);
        assert_eq!(resolved.get("P"), Some("1"));
        assert!(resolved.is_flat());
    }

    #[test]
    fn resolve_skips_false_conditions() {
        let config = parse_fixture()
            .property_group(Some("Configuration"))
            .unwrap()
            .resolve(&Environment::for_configuration("Release", "x64"))
            .unwrap();
        assert_eq!(config.get("UseDebugLibraries"), Some("false"));
        assert_eq!(config.properties().len(), 2);
    }

    #[test]
    fn resolve_items_expands_include_and_metadata() {
        let env = debug_x64().with_var("ProjectDir", "C:\\app\\");
        let group = parse_fixture().item_group(None).unwrap().resolve(&env).unwrap();
        let main = &group.items()[0];
        assert_eq!(
            main.metadata("AdditionalIncludeDirectories"),
            Some("C:\\app\\extra")
        );
        let generated = group
            .items()
            .iter()
            .find(|i| i.include.contains("generated"))
            .unwrap();
        assert_eq!(generated.include, "gen\\x64\\generated.cpp");
    }

    #[test]
    fn resolve_propagates_malformed_condition() {
        let mut group = ItemGroup::new(None);
        group
            .conditional_mut("'$(Configuration)'!='Debug'")
            .push(ProjectItem::new("a.cpp", ITEM_TYPE_CL_COMPILE));
        let result = group.resolve(&debug_x64());
        assert!(matches!(result, Err(Error::MalformedCondition { .. })));
    }

    #[test]
    fn default_property_group_resolves_nmake_settings() {
        let content = parse_fixture();
        let group = content.property_group(None).unwrap().resolve(&debug_x64()).unwrap();
        assert_eq!(
            group.get("NMakePreprocessorDefinitions"),
            Some("WIN32;_DEBUG")
        );
        assert_eq!(group.get("NMakeIncludeSearchPath"), Some("include;third_party\\include"));
    }

    // ── Project ──────────────────────────────────────────────────────────

    #[test]
    fn project_kind_from_type_id() {
        assert_eq!(ProjectKind::from_type_id(PROJECT_TYPE_FOLDER), ProjectKind::Folder);
        assert_eq!(
            ProjectKind::from_type_id(&PROJECT_TYPE_MAKEFILE.to_lowercase()),
            ProjectKind::Makefile
        );
        assert_eq!(ProjectKind::from_type_id(PROJECT_TYPE_MANAGED), ProjectKind::Managed);
        assert_eq!(ProjectKind::from_type_id("0000"), ProjectKind::Other);
    }

    #[test]
    fn folder_project_never_touches_disk() {
        let project = Project::new(
            PROJECT_TYPE_FOLDER,
            "Libraries",
            "Libraries",
            "F0F0",
            Path::new("/does/not/exist"),
        );
        assert!(project.item_groups().unwrap().is_empty());
        assert!(project.default_property_group().unwrap().is_none());
        assert!(project.source_files().unwrap().is_empty());
    }

    #[test]
    fn project_loads_lazily_and_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("App")).unwrap();
        let file = dir.path().join("App").join("App.vcxproj");
        std::fs::write(&file, NMAKE_PROJECT).unwrap();

        let project = Project::new(PROJECT_TYPE_MAKEFILE, "App", "App\\App.vcxproj", "AAAA", dir.path());
        assert_eq!(project.abs_path(), file.as_path());
        assert!(!project.is_loaded());

        assert!(project.default_item_group().unwrap().is_some());
        assert!(project.is_loaded());

        // Content is cached; the file is no longer needed.
        std::fs::remove_file(&file).unwrap();
        assert_eq!(project.item_groups().unwrap().len(), 2);
    }

    #[test]
    fn project_missing_file_is_io_error() {
        let project = Project::new(
            PROJECT_TYPE_MAKEFILE,
            "Ghost",
            "Ghost\\Ghost.vcxproj",
            "DEAD",
            Path::new("/does/not/exist"),
        );
        assert!(matches!(project.content(), Err(Error::Io { .. })));
        assert!(!project.is_loaded());
    }

    #[test]
    fn project_resolve_in_place() {
        let mut project = Project::new(PROJECT_TYPE_MAKEFILE, "App", "App\\App.vcxproj", "AAAA", Path::new("/ws"))
            .with_content(parse_fixture());
        project.resolve(&debug_x64()).unwrap();

        let config = project.property_group(Some("Configuration")).unwrap().unwrap();
        assert!(config.is_flat());
        assert_eq!(config.get("UseDebugLibraries"), Some("true"));
    }

    #[test]
    fn project_source_files_are_absolute() {
        let project = Project::new(PROJECT_TYPE_MAKEFILE, "App", "App\\App.vcxproj", "AAAA", Path::new("/ws"))
            .with_content(parse_fixture());
        let files = project.source_files().unwrap();
        let app_dir = Path::new("/ws").join("App");
        assert!(files.contains(&app_dir.join("src").join("main.cpp")));
        assert!(files.contains(&app_dir.join("include").join("app.h")));
        assert!(files.iter().all(|f| f.is_absolute() || cfg!(windows)));
    }

    #[test]
    fn project_resolved_default_item_group() {
        let project = Project::new(PROJECT_TYPE_MAKEFILE, "App", "App\\App.vcxproj", "AAAA", Path::new("/ws"))
            .with_content(parse_fixture());
        let group = project
            .resolved_default_item_group(&debug_x64())
            .unwrap()
            .unwrap();
        assert_eq!(group.source_items().count(), 4);
        assert!(project.resolved_item_group(Some("Nope"), &debug_x64()).unwrap().is_none());
    }

    #[test]
    fn items_filtered_by_type() {
        let content = parse_fixture();
        let group = content.item_group(None).unwrap();

        let native: Vec<&str> = group
            .items_of_types(&[ITEM_TYPE_CL_COMPILE, ITEM_TYPE_CL_INCLUDE])
            .map(|i| i.include.as_str())
            .collect();
        assert_eq!(native, vec!["src\\main.cpp", "src\\util.cpp", "include\\app.h"]);
        assert_eq!(group.items_of_type(ITEM_TYPE_CL_INCLUDE).count(), 1);
        assert_eq!(group.items_of_types(&[ITEM_TYPE_COMPILE]).count(), 0);
        assert_eq!(group.items().len(), 4);
        assert_eq!(group.items().iter().filter(|i| i.is_source()).count(), 3);
    }
}
