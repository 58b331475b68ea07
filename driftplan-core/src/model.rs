//! Dialect-neutral schema model.
//!
//! Produced by the dialect parsers and by live introspection; consumed by the
//! object-type filter and the differ. Objects reference each other by name
//! only.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

/// Kind of a schema-level object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Table,
    View,
    Index,
    Trigger,
    Procedure,
    Alias,
    VirtualTable,
    AuxiliaryTable,
    RawUnparsed,
}

impl ObjectKind {
    /// Every kind, in display order.
    pub const ALL: [ObjectKind; 9] = [
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::Index,
        ObjectKind::Trigger,
        ObjectKind::Procedure,
        ObjectKind::Alias,
        ObjectKind::VirtualTable,
        ObjectKind::AuxiliaryTable,
        ObjectKind::RawUnparsed,
    ];

    /// Name used in plan lines (`Create Virtual Table: x`).
    pub fn display_name(&self) -> &'static str {
        match self {
            ObjectKind::Table => "Table",
            ObjectKind::View => "View",
            ObjectKind::Index => "Index",
            ObjectKind::Trigger => "Trigger",
            ObjectKind::Procedure => "Procedure",
            ObjectKind::Alias => "Alias",
            ObjectKind::VirtualTable => "Virtual Table",
            ObjectKind::AuxiliaryTable => "Auxiliary Table",
            ObjectKind::RawUnparsed => "Raw SQL",
        }
    }

    /// Parse a single kind name as accepted by `--object-types`.
    ///
    /// Case-insensitive; accepts singular and plural forms and treats `-`,
    /// `_` and spaces alike.
    pub fn parse(name: &str) -> Option<ObjectKind> {
        let key: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        match key.as_str() {
            "table" | "tables" => Some(ObjectKind::Table),
            "view" | "views" => Some(ObjectKind::View),
            "index" | "indexes" | "indices" => Some(ObjectKind::Index),
            "trigger" | "triggers" => Some(ObjectKind::Trigger),
            "procedure" | "procedures" | "function" | "functions" | "routine" | "routines" => {
                Some(ObjectKind::Procedure)
            }
            "alias" | "aliases" | "synonym" | "synonyms" => Some(ObjectKind::Alias),
            "virtualtable" | "virtualtables" => Some(ObjectKind::VirtualTable),
            "auxtable" | "auxtables" | "auxiliarytable" | "auxiliarytables" => {
                Some(ObjectKind::AuxiliaryTable)
            }
            "raw" | "rawunparsed" | "unparsed" | "other" => Some(ObjectKind::RawUnparsed),
            _ => None,
        }
    }

    /// Parse a comma-separated kind list. Unknown names are logged and skipped.
    pub fn parse_list(list: &str) -> Vec<ObjectKind> {
        let mut kinds = Vec::new();
        for item in list.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            match ObjectKind::parse(item) {
                Some(kind) => {
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                None => log::warn!("Ignoring unknown object type; name={}", item),
            }
        }
        kinds
    }

    /// Whether a changed object of this kind is reported as `Alter`.
    ///
    /// Kinds without partial-alter semantics are replaced (drop + create).
    pub fn supports_alter(&self) -> bool {
        matches!(
            self,
            ObjectKind::Table | ObjectKind::Index | ObjectKind::RawUnparsed
        )
    }

    /// Kinds a view, index or foreign key can name as its relation.
    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            ObjectKind::Table
                | ObjectKind::View
                | ObjectKind::VirtualTable
                | ObjectKind::AuxiliaryTable
                | ObjectKind::Alias
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Case-normalized object name with optional schema/database qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self::new(None, name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Identity of an object within a [`SchemaModel`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectKey {
    pub kind: ObjectKind,
    pub name: QualifiedName,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.name)
    }
}

/// Dialect-neutral type family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeToken {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Real,
    Float,
    Double,
    Boolean,
    Char,
    Varchar,
    Text,
    Binary,
    Varbinary,
    Blob,
    Clob,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Json,
    Uuid,
    Xml,
    /// Anything else, upper-cased with whitespace collapsed.
    Other(String),
}

/// A declared column type.
///
/// Equality ignores `raw`, which is kept only for display.
#[derive(Debug, Clone, Serialize)]
pub struct DataType {
    pub token: TypeToken,
    /// Length / precision / scale / modifiers such as `UNSIGNED`.
    pub params: Vec<String>,
    /// Type as written in the source.
    pub raw: String,
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token && self.params == other.params
    }
}

impl Eq for DataType {}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// How a column's value is produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    #[default]
    None,
    Identity,
    RowStart,
    RowEnd,
    TransactionId,
    Computed(String),
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::None => write!(f, "none"),
            Generation::Identity => write!(f, "identity"),
            Generation::RowStart => write!(f, "row-start"),
            Generation::RowEnd => write!(f, "row-end"),
            Generation::TransactionId => write!(f, "transaction-id"),
            Generation::Computed(expr) => write!(f, "computed({})", expr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub default: Option<String>,
    pub generation: Generation,
    /// 1-based position within the table.
    pub ordinal: usize,
    /// Remaining column clauses (collation, comment, charset, ...), normalized.
    pub attributes: Vec<String>,
}

impl Column {
    /// Definition equality, ignoring name and position.
    pub fn same_definition(&self, other: &Column) -> bool {
        self.data_type == other.data_type
            && self.nullable == other.nullable
            && self.default == other.default
            && self.generation == other.generation
            && self.attributes == other.attributes
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default)?;
        }
        if self.generation != Generation::None {
            write!(f, " [{}]", self.generation)?;
        }
        for attr in &self.attributes {
            write!(f, " {}", attr)?;
        }
        Ok(())
    }
}

/// Target of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyRef {
    pub table: QualifiedName,
    pub columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey(ForeignKeyRef),
    Check(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub name: Option<String>,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    /// Clustering / partitioning / deferrability modifiers, upper-cased.
    pub modifiers: Vec<String>,
}

impl Constraint {
    /// Structural equality. Names only count when both sides carry one, since
    /// catalogs name constraints the source text often leaves anonymous.
    pub fn equivalent(&self, other: &Constraint) -> bool {
        let names_match = match (&self.name, &other.name) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        names_match
            && self.kind == other.kind
            && self.columns == other.columns
            && self.modifiers == other.modifiers
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {} ", name)?;
        }
        match &self.kind {
            ConstraintKind::PrimaryKey => write!(f, "PRIMARY KEY ({})", self.columns.join(", "))?,
            ConstraintKind::Unique => write!(f, "UNIQUE ({})", self.columns.join(", "))?,
            ConstraintKind::ForeignKey(fk) => {
                write!(
                    f,
                    "FOREIGN KEY ({}) REFERENCES {}",
                    self.columns.join(", "),
                    fk.table
                )?;
                if !fk.columns.is_empty() {
                    write!(f, " ({})", fk.columns.join(", "))?;
                }
                if let Some(action) = &fk.on_delete {
                    write!(f, " ON DELETE {}", action)?;
                }
                if let Some(action) = &fk.on_update {
                    write!(f, " ON UPDATE {}", action)?;
                }
            }
            ConstraintKind::Check(expr) => write!(f, "CHECK ({})", expr)?,
        }
        for modifier in &self.modifiers {
            write!(f, " {}", modifier)?;
        }
        Ok(())
    }
}

/// Partition specification of a table or index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionSpec {
    /// `RANGE`, `LIST`, `HASH`, `KEY`, ...
    pub method: String,
    /// Partitioning key expression, normalized.
    pub key: String,
    /// Individual partition definitions, normalized.
    pub partitions: Vec<String>,
}

impl fmt::Display for PartitionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PARTITION BY {} ({})", self.method, self.key)?;
        if !self.partitions.is_empty() {
            write!(f, " [{} partitions]", self.partitions.len())?;
        }
        Ok(())
    }
}

/// Physical storage and placement attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Storage {
    /// MySQL storage engine.
    pub engine: Option<String>,
    /// DB2 `IN db.ts` / PostgreSQL tablespace.
    pub placement: Option<String>,
    pub stogroup: Option<String>,
    pub priqty: Option<String>,
    pub secqty: Option<String>,
    pub audit: Option<String>,
    pub ccsid: Option<String>,
    pub partition: Option<PartitionSpec>,
}

impl Storage {
    pub fn is_empty(&self) -> bool {
        *self == Storage::default()
    }

    /// Field-by-field description of what differs from `other`.
    pub fn changes_to(&self, other: &Storage) -> Vec<String> {
        let mut changes = Vec::new();
        let fields: [(&str, &Option<String>, &Option<String>); 7] = [
            ("engine", &self.engine, &other.engine),
            ("placement", &self.placement, &other.placement),
            ("storage group", &self.stogroup, &other.stogroup),
            ("PRIQTY", &self.priqty, &other.priqty),
            ("SECQTY", &self.secqty, &other.secqty),
            ("audit", &self.audit, &other.audit),
            ("CCSID", &self.ccsid, &other.ccsid),
        ];
        for (label, from, to) in fields {
            if from != to {
                changes.push(format!(
                    "{} changed from {} to {}",
                    label,
                    from.as_deref().unwrap_or("(none)"),
                    to.as_deref().unwrap_or("(none)")
                ));
            }
        }
        if self.partition != other.partition {
            let describe = |p: &Option<PartitionSpec>| {
                p.as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            };
            changes.push(format!(
                "partitioning changed from {} to {}",
                describe(&self.partition),
                describe(&other.partition)
            ));
        }
        changes
    }
}

/// System-versioning attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Versioning {
    /// `PERIOD FOR SYSTEM_TIME (start, end)` columns.
    pub system_time: Option<(String, String)>,
    /// `WITH SYSTEM VERSIONING` table option.
    pub system_versioned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: QualifiedName,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
    /// Indexes declared inside the table body (MySQL `KEY`, `FULLTEXT`, ...).
    pub indexes: Vec<Index>,
    pub storage: Storage,
    pub versioning: Versioning,
    /// Unmodeled clauses: upper-cased key to normalized value.
    pub options: BTreeMap<String, String>,
}

impl Table {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            storage: Storage::default(),
            versioning: Versioning::default(),
            options: BTreeMap::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Tables named by this table's foreign keys, excluding itself.
    pub fn referenced_tables(&self) -> Vec<QualifiedName> {
        let mut refs: Vec<QualifiedName> = Vec::new();
        for constraint in &self.constraints {
            if let ConstraintKind::ForeignKey(fk) = &constraint.kind {
                if fk.table != self.name && !refs.contains(&fk.table) {
                    refs.push(fk.table.clone());
                }
            }
        }
        refs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Default,
    Fulltext,
    Spatial,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Default => write!(f, "default"),
            IndexKind::Fulltext => write!(f, "fulltext"),
            IndexKind::Spatial => write!(f, "spatial"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    pub name: QualifiedName,
    pub table: QualifiedName,
    /// Key columns or expressions, with ` DESC` where descending.
    pub columns: Vec<String>,
    pub unique: bool,
    pub kind: IndexKind,
    /// `CLUSTER`, `PARTITIONED`, `USING gin`, `WHERE ...`, `INCLUDE (...)`.
    pub modifiers: Vec<String>,
    pub storage: Storage,
    pub options: BTreeMap<String, String>,
}

impl Index {
    pub fn new(name: QualifiedName, table: QualifiedName) -> Self {
        Self {
            name,
            table,
            columns: Vec::new(),
            unique: false,
            kind: IndexKind::Default,
            modifiers: Vec::new(),
            storage: Storage::default(),
            options: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unique {
            write!(f, "UNIQUE ")?;
        }
        if self.kind != IndexKind::Default {
            write!(f, "{} ", self.kind.to_string().to_uppercase())?;
        }
        write!(f, "{} ON {} ({})", self.name, self.table, self.columns.join(", "))?;
        for modifier in &self.modifiers {
            write!(f, " {}", modifier)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub name: QualifiedName,
    /// Defining query, whitespace-normalized.
    pub query: String,
    pub materialized: bool,
    /// Explicit column list, if any.
    pub columns: Vec<String>,
    /// Best-effort list of referenced relations, used only for ordering.
    pub references: Vec<QualifiedName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerTiming::Before => write!(f, "BEFORE"),
            TriggerTiming::After => write!(f, "AFTER"),
            TriggerTiming::InsteadOf => write!(f, "INSTEAD OF"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
    Truncate,
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerEvent::Insert => write!(f, "INSERT"),
            TriggerEvent::Update => write!(f, "UPDATE"),
            TriggerEvent::Delete => write!(f, "DELETE"),
            TriggerEvent::Truncate => write!(f, "TRUNCATE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trigger {
    pub name: QualifiedName,
    pub table: QualifiedName,
    pub timing: TriggerTiming,
    /// Sorted, without duplicates.
    pub events: Vec<TriggerEvent>,
    /// Everything after the owning table, whitespace-normalized.
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    Procedure,
    Function,
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutineKind::Procedure => write!(f, "PROCEDURE"),
            RoutineKind::Function => write!(f, "FUNCTION"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Procedure {
    pub name: QualifiedName,
    pub routine: RoutineKind,
    /// Everything after the routine name, whitespace-normalized.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alias {
    pub name: QualifiedName,
    pub target: QualifiedName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualTable {
    pub name: QualifiedName,
    pub module: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuxiliaryTable {
    pub name: QualifiedName,
    /// `IN db.ts` placement.
    pub placement: Option<String>,
    /// Base table whose LOB column this table stores.
    pub base_table: QualifiedName,
    pub column: String,
    pub part: Option<u32>,
}

/// A statement kept as normalized text because no parser modeled it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawUnparsed {
    /// Object type and name when recognizable (`SEQUENCE order_seq`),
    /// otherwise the normalized statement text.
    pub label: QualifiedName,
    /// Leading verb (`CREATE`, `ALTER`, `DROP`).
    pub verb: String,
    pub text: String,
}

/// One schema-level object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatabaseObject {
    Table(Table),
    View(View),
    Index(Index),
    Trigger(Trigger),
    Procedure(Procedure),
    Alias(Alias),
    VirtualTable(VirtualTable),
    AuxiliaryTable(AuxiliaryTable),
    Raw(RawUnparsed),
}

impl DatabaseObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            DatabaseObject::Table(_) => ObjectKind::Table,
            DatabaseObject::View(_) => ObjectKind::View,
            DatabaseObject::Index(_) => ObjectKind::Index,
            DatabaseObject::Trigger(_) => ObjectKind::Trigger,
            DatabaseObject::Procedure(_) => ObjectKind::Procedure,
            DatabaseObject::Alias(_) => ObjectKind::Alias,
            DatabaseObject::VirtualTable(_) => ObjectKind::VirtualTable,
            DatabaseObject::AuxiliaryTable(_) => ObjectKind::AuxiliaryTable,
            DatabaseObject::Raw(_) => ObjectKind::RawUnparsed,
        }
    }

    pub fn name(&self) -> &QualifiedName {
        match self {
            DatabaseObject::Table(t) => &t.name,
            DatabaseObject::View(v) => &v.name,
            DatabaseObject::Index(i) => &i.name,
            DatabaseObject::Trigger(t) => &t.name,
            DatabaseObject::Procedure(p) => &p.name,
            DatabaseObject::Alias(a) => &a.name,
            DatabaseObject::VirtualTable(v) => &v.name,
            DatabaseObject::AuxiliaryTable(a) => &a.name,
            DatabaseObject::Raw(r) => &r.label,
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            kind: self.kind(),
            name: self.name().clone(),
        }
    }

    /// Relations this object must be created after (and dropped before).
    pub fn dependencies(&self) -> Vec<QualifiedName> {
        match self {
            DatabaseObject::Table(t) => t.referenced_tables(),
            DatabaseObject::View(v) => v
                .references
                .iter()
                .filter(|r| **r != v.name)
                .cloned()
                .collect(),
            DatabaseObject::Index(i) => vec![i.table.clone()],
            DatabaseObject::Trigger(t) => vec![t.table.clone()],
            DatabaseObject::Alias(a) => vec![a.target.clone()],
            DatabaseObject::AuxiliaryTable(a) => vec![a.base_table.clone()],
            DatabaseObject::Procedure(_)
            | DatabaseObject::VirtualTable(_)
            | DatabaseObject::Raw(_) => Vec::new(),
        }
    }
}

/// A non-fatal problem found while building a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelWarning {
    /// Source label (file path, `live database`, ...).
    pub source: String,
    pub message: String,
}

impl fmt::Display for ModelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// Ordered-by-discovery, key-unique collection of database objects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaModel {
    objects: Vec<DatabaseObject>,
    #[serde(skip)]
    positions: HashMap<ObjectKey, usize>,
    warnings: Vec<ModelWarning>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object. A previous object with the same key is replaced in
    /// place (keeping its discovery position) and returned.
    pub fn insert(&mut self, object: DatabaseObject) -> Option<DatabaseObject> {
        let key = object.key();
        match self.positions.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.objects[pos], object)),
            None => {
                self.positions.insert(key, self.objects.len());
                self.objects.push(object);
                None
            }
        }
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&DatabaseObject> {
        self.positions.get(key).map(|&pos| &self.objects[pos])
    }

    pub(crate) fn get_mut(&mut self, key: &ObjectKey) -> Option<&mut DatabaseObject> {
        match self.positions.get(key) {
            Some(&pos) => Some(&mut self.objects[pos]),
            None => None,
        }
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.positions.contains_key(key)
    }

    /// Discovery position of an object.
    pub fn position(&self, key: &ObjectKey) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatabaseObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn warnings(&self) -> &[ModelWarning] {
        &self.warnings
    }

    pub fn push_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ModelWarning {
            source: source.into(),
            message: message.into(),
        });
    }

    /// Number of objects of each kind present, in [`ObjectKind::ALL`] order.
    pub fn kind_counts(&self) -> Vec<(ObjectKind, usize)> {
        ObjectKind::ALL
            .iter()
            .map(|k| (*k, self.objects.iter().filter(|o| o.kind() == *k).count()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

impl PartialEq for SchemaModel {
    /// Models are equal when they hold the same objects in the same order.
    fn eq(&self, other: &Self) -> bool {
        self.objects == other.objects
    }
}
