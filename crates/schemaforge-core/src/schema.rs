//! Portable schema entities.
//!
//! These types describe the desired shape of a relational database without
//! committing to a dialect. Builders construct them and hand back frozen
//! values; inspectors return freshly owned snapshots of a live catalog; the
//! diff engine compares two snapshots. Nothing here performs I/O.

use serde::{Deserialize, Serialize};

use crate::types::PortableType;

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ForeignKeyAction {
    /// No action (the dialect default; omitted from generated DDL).
    #[default]
    NoAction,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the referencing column to NULL.
    SetNull,
    /// Set the referencing column to its default value.
    SetDefault,
    /// Reject the delete/update immediately.
    Restrict,
}

impl ForeignKeyAction {
    /// Returns the SQL keyword sequence for this action.
    #[must_use]
    pub fn to_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
        }
    }
}

/// A column declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Portable data type.
    #[serde(rename = "type")]
    pub ty: PortableType,
    /// Whether NULL values are allowed. Identity columns are never nullable
    /// regardless of this flag; see [`Column::is_nullable`].
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub nullable: bool,
    /// Literal dialect SQL default. Ignored when `default_portable` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sql: Option<String>,
    /// Portable default expression, lowered per dialect at generation time.
    /// Takes precedence over `default_sql`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_portable: Option<String>,
    /// Whether the column value is generated by the database.
    #[serde(default, skip_serializing_if = "is_false")]
    pub identity: bool,
    /// First generated identity value.
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub seed: i64,
    /// Step between generated identity values.
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub increment: i64,
    /// Expression for a computed column. Mutually exclusive with defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_expression: Option<String>,
    /// Whether a computed column is stored rather than evaluated on read.
    #[serde(default, skip_serializing_if = "is_false")]
    pub persisted: bool,
    /// Collation name, if pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Per-column check expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_expression: Option<String>,
    /// Free-form comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Column {
    /// Creates a nullable column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: PortableType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            default_sql: None,
            default_portable: None,
            identity: false,
            seed: 1,
            increment: 1,
            computed_expression: None,
            persisted: false,
            collation: None,
            check_expression: None,
            comment: None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets a literal dialect SQL default, clearing any portable default.
    #[must_use]
    pub fn default_sql(mut self, sql: impl Into<String>) -> Self {
        self.default_sql = Some(sql.into());
        self.default_portable = None;
        self
    }

    /// Sets a portable default expression, clearing any literal default.
    #[must_use]
    pub fn default_portable(mut self, expr: impl Into<String>) -> Self {
        self.default_portable = Some(expr.into());
        self.default_sql = None;
        self
    }

    /// Marks the column as database-generated with seed and increment 1.
    #[must_use]
    pub fn identity(self) -> Self {
        self.identity_with(1, 1)
    }

    /// Marks the column as database-generated with an explicit seed and
    /// increment. Identity columns are forced NOT NULL.
    #[must_use]
    pub fn identity_with(mut self, seed: i64, increment: i64) -> Self {
        self.identity = true;
        self.seed = seed;
        self.increment = increment;
        self.nullable = false;
        self
    }

    /// Turns the column into a computed column.
    #[must_use]
    pub fn computed(mut self, expression: impl Into<String>) -> Self {
        self.computed_expression = Some(expression.into());
        self
    }

    /// Stores the computed value instead of evaluating it on read.
    #[must_use]
    pub fn persisted(mut self) -> Self {
        self.persisted = true;
        self
    }

    /// Pins the collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Attaches a per-column check expression.
    #[must_use]
    pub fn check(mut self, expression: impl Into<String>) -> Self {
        self.check_expression = Some(expression.into());
        self
    }

    /// Attaches a comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Effective nullability: identity always wins over the declared flag.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable && !self.identity
    }

    /// The default the generator should use: portable first, literal second.
    #[must_use]
    pub fn effective_default(&self) -> Option<EffectiveDefault<'_>> {
        if let Some(expr) = &self.default_portable {
            return Some(EffectiveDefault::Portable(expr));
        }
        self.default_sql.as_deref().map(EffectiveDefault::Sql)
    }
}

/// Which of a column's two default channels applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveDefault<'a> {
    /// A portable expression to be lowered per dialect.
    Portable(&'a str),
    /// Literal SQL emitted verbatim.
    Sql(&'a str),
}

/// A primary-key declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrimaryKey {
    /// Constraint name, if pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Ordered member columns (non-empty).
    pub columns: Vec<String>,
}

impl PrimaryKey {
    /// Creates an unnamed primary key over the given columns.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            name: None,
            columns,
        }
    }

    /// Pins the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// An index declaration: either over columns or over expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Ordered member columns. Empty iff `expressions` is non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// Ordered opaque SQL expression fragments. Empty iff `columns` is
    /// non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<String>,
    /// Whether the index enforces uniqueness.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Partial-index predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Index {
    /// Creates a non-unique index over columns.
    #[must_use]
    pub fn on_columns(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            expressions: Vec::new(),
            unique: false,
            filter: None,
        }
    }

    /// Creates a non-unique index over opaque SQL expressions.
    #[must_use]
    pub fn on_expressions(name: impl Into<String>, expressions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            expressions,
            unique: false,
            filter: None,
        }
    }

    /// Makes the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Restricts the index to rows matching a predicate.
    #[must_use]
    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        self.filter = Some(predicate.into());
        self
    }
}

/// A foreign-key declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForeignKey {
    /// Constraint name. Anonymous keys are additive-only in diffs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Referencing columns, in order.
    pub columns: Vec<String>,
    /// Referenced table name.
    pub referenced_table: String,
    /// Namespace of the referenced table, when it differs from the
    /// referencing table's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_schema: Option<String>,
    /// Referenced columns, same length as `columns`.
    pub referenced_columns: Vec<String>,
    /// Action on delete of the referenced row.
    #[serde(default, skip_serializing_if = "is_no_action")]
    pub on_delete: ForeignKeyAction,
    /// Action on update of the referenced key.
    #[serde(default, skip_serializing_if = "is_no_action")]
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    /// Creates an anonymous foreign key.
    #[must_use]
    pub fn new(
        columns: Vec<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
    ) -> Self {
        Self {
            name: None,
            columns,
            referenced_table: referenced_table.into(),
            referenced_schema: None,
            referenced_columns,
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    /// Pins the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the referenced table's namespace.
    #[must_use]
    pub fn referenced_schema(mut self, schema: impl Into<String>) -> Self {
        self.referenced_schema = Some(schema.into());
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    /// True when both sides have the same columns and referenced shape.
    /// Used to avoid re-adding an anonymous key that is already present.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        fn eq_ci(a: &[String], b: &[String]) -> bool {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| x.eq_ignore_ascii_case(y))
        }
        eq_ci(&self.columns, &other.columns)
            && self
                .referenced_table
                .eq_ignore_ascii_case(&other.referenced_table)
            && eq_ci(&self.referenced_columns, &other.referenced_columns)
    }
}

/// A unique constraint over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniqueConstraint {
    /// Constraint name. Anonymous constraints are additive-only in diffs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Ordered member columns (non-empty).
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    /// Creates an anonymous unique constraint.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            name: None,
            columns,
        }
    }

    /// Pins the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A table-level check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,
    /// Boolean SQL expression.
    pub expression: String,
}

impl CheckConstraint {
    /// Creates a named check constraint.
    #[must_use]
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// A table declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Ordered column declarations.
    pub columns: Vec<Column>,
    /// Primary key, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
    /// Secondary indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<Index>,
    /// Foreign keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
    /// Unique constraints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_constraints: Vec<UniqueConstraint>,
    /// Table-level check constraints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub check_constraints: Vec<CheckConstraint>,
    /// Schema namespace; `"public"` by default and on SQLite's `"main"`.
    #[serde(default = "default_namespace", skip_serializing_if = "is_default_namespace")]
    pub schema_namespace: String,
    /// Free-form comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Table {
    /// Creates an empty table in the default namespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            indices: Vec::new(),
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
            check_constraints: Vec::new(),
            schema_namespace: default_namespace(),
            comment: None,
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn primary_key(mut self, pk: PrimaryKey) -> Self {
        self.primary_key = Some(pk);
        self
    }

    /// Appends an index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    /// Appends a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Appends a unique constraint.
    #[must_use]
    pub fn unique_constraint(mut self, uc: UniqueConstraint) -> Self {
        self.unique_constraints.push(uc);
        self
    }

    /// Appends a table-level check constraint.
    #[must_use]
    pub fn check_constraint(mut self, cc: CheckConstraint) -> Self {
        self.check_constraints.push(cc);
        self
    }

    /// Sets the schema namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.schema_namespace = namespace.into();
        self
    }

    /// Attaches a comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Finds a column by name, case-insensitively.
    #[must_use]
    pub fn column_named(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// A named container of tables. Table order is declaration order and is
/// preserved through serialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    /// Schema name.
    pub name: String,
    /// Tables in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
        }
    }

    /// Builds a schema from tables in one call.
    #[must_use]
    pub fn build(name: impl Into<String>, tables: Vec<Table>) -> Self {
        Self {
            name: name.into(),
            tables,
        }
    }

    /// Appends a table.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Finds a table by name, case-insensitively. The namespace is ignored,
    /// accommodating default-namespace drift between dialects.
    #[must_use]
    pub fn table_named(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Iterates table names in declaration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }
}

fn default_true() -> bool {
    true
}

fn default_one() -> i64 {
    1
}

fn default_namespace() -> String {
    "public".to_string()
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_one(v: &i64) -> bool {
    *v == 1
}

fn is_default_namespace(ns: &str) -> bool {
    ns == "public"
}

fn is_no_action(action: &ForeignKeyAction) -> bool {
    *action == ForeignKeyAction::NoAction
}
