//! Static per-kind field tables.
//!
//! Each kind declares the fields it recognizes, their JSON shape, and which
//! of them reference other resources. The state transformer and the relation
//! inflator are driven entirely by these tables; there is no per-kind
//! parsing code.

use crate::types::ResourceKind;

/// Expected JSON shape of a recognized field. `null` is always accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Flag,
    Number,
    /// ISO 8601 timestamp string.
    Date,
    /// Any JSON value, kept as-is.
    Json,
    /// A single id string.
    Id,
    /// An array of id strings.
    IdList,
    /// An array of full objects of the relation's target kind.
    Embedded,
}

impl FieldType {
    pub fn describe(self) -> &'static str {
        match self {
            FieldType::Text => "a string",
            FieldType::Flag => "a boolean",
            FieldType::Number => "a number",
            FieldType::Date => "a date string",
            FieldType::Json => "any value",
            FieldType::Id => "an id string",
            FieldType::IdList => "an array of id strings",
            FieldType::Embedded => "an array of objects",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Where a relation field points and under which name the live link is
/// exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationSpec {
    pub attribute: &'static str,
    pub target: ResourceKind,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub relation: Option<RelationSpec>,
}

#[derive(Debug)]
pub struct Schema {
    pub kind: ResourceKind,
    pub fields: &'static [FieldSpec],
    /// Fields that must be set before `create` may POST.
    pub create_required: &'static [&'static str],
    pub deletable: bool,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that reference other resources, with their relation.
    pub fn relations(&self) -> impl Iterator<Item = (&'static FieldSpec, RelationSpec)> {
        self.fields
            .iter()
            .filter_map(|field| field.relation.map(|relation| (field, relation)))
    }

    /// The relation exposed under `attribute`, if any.
    pub fn relation(&self, attribute: &str) -> Option<RelationSpec> {
        self.relations()
            .map(|(_, relation)| relation)
            .find(|relation| relation.attribute == attribute)
    }

    /// The id field backing the link `attribute` (e.g. `idList` for `list`).
    pub fn id_field_for(&self, attribute: &str) -> Option<&'static FieldSpec> {
        self.relations()
            .find(|(field, relation)| relation.attribute == attribute && field.ty != FieldType::Embedded)
            .map(|(field, _)| field)
    }
}

const fn plain(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        relation: None,
    }
}

const fn one(name: &'static str, attribute: &'static str, target: ResourceKind) -> FieldSpec {
    FieldSpec {
        name,
        ty: FieldType::Id,
        relation: Some(RelationSpec {
            attribute,
            target,
            cardinality: Cardinality::One,
        }),
    }
}

const fn many(name: &'static str, attribute: &'static str, target: ResourceKind) -> FieldSpec {
    FieldSpec {
        name,
        ty: FieldType::IdList,
        relation: Some(RelationSpec {
            attribute,
            target,
            cardinality: Cardinality::Many,
        }),
    }
}

const fn embedded(name: &'static str, attribute: &'static str, target: ResourceKind) -> FieldSpec {
    FieldSpec {
        name,
        ty: FieldType::Embedded,
        relation: Some(RelationSpec {
            attribute,
            target,
            cardinality: Cardinality::Many,
        }),
    }
}

use FieldType::{Date, Flag, Json, Number, Text};
use ResourceKind as K;

static ORGANIZATION: Schema = Schema {
    kind: K::Organization,
    fields: &[
        plain("id", FieldType::Id),
        plain("billableMemberCount", Number),
        plain("desc", Text),
        plain("descData", Json),
        plain("displayName", Text),
        many("idBoards", "boards", K::Board),
        plain("invitations", Json),
        plain("invited", Flag),
        plain("logoHash", Text),
        plain("memberships", Json),
        plain("name", Text),
        plain("powerUps", Json),
        plain("prefs", Json),
        plain("premiumFeatures", Json),
        plain("products", Json),
        plain("url", Text),
        plain("website", Text),
    ],
    create_required: &["displayName"],
    deletable: true,
};

static BOARD: Schema = Schema {
    kind: K::Board,
    fields: &[
        plain("id", FieldType::Id),
        plain("closed", Flag),
        plain("dateLastActivity", Date),
        plain("dateLastView", Date),
        plain("desc", Text),
        plain("descData", Json),
        one("idOrganization", "organization", K::Organization),
        plain("invitations", Json),
        plain("invited", Flag),
        plain("labelNames", Json),
        plain("memberships", Json),
        plain("name", Text),
        plain("pinned", Flag),
        plain("powerUps", Json),
        plain("prefs", Json),
        plain("shortLink", Text),
        plain("shortUrl", Text),
        plain("starred", Flag),
        plain("subscribed", Flag),
        plain("url", Text),
    ],
    create_required: &["name"],
    deletable: false,
};

static LIST: Schema = Schema {
    kind: K::List,
    fields: &[
        plain("id", FieldType::Id),
        plain("closed", Flag),
        one("idBoard", "board", K::Board),
        plain("name", Text),
        plain("pos", Number),
        plain("subscribed", Flag),
    ],
    create_required: &["name", "idBoard"],
    deletable: false,
};

static CARD: Schema = Schema {
    kind: K::Card,
    fields: &[
        plain("id", FieldType::Id),
        plain("badges", Json),
        plain("checkItemStates", Json),
        plain("closed", Flag),
        plain("dateLastActivity", Date),
        plain("desc", Text),
        plain("descData", Json),
        plain("due", Date),
        plain("email", Text),
        plain("idAttachmentCover", FieldType::Id),
        one("idBoard", "board", K::Board),
        many("idChecklists", "checklists", K::Checklist),
        many("idLabels", "labels", K::Label),
        one("idList", "list", K::List),
        plain("idMembers", FieldType::IdList),
        plain("idMembersVoted", FieldType::IdList),
        plain("idShort", Number),
        embedded("labels", "labels", K::Label),
        plain("manualCoverAttachment", Flag),
        plain("name", Text),
        plain("pos", Number),
        plain("shortLink", Text),
        plain("shortUrl", Text),
        plain("subscribed", Flag),
        plain("url", Text),
    ],
    create_required: &["idList"],
    deletable: true,
};

static CHECKLIST: Schema = Schema {
    kind: K::Checklist,
    fields: &[
        plain("id", FieldType::Id),
        embedded("checkItems", "check_items", K::CheckItem),
        one("idBoard", "board", K::Board),
        one("idCard", "card", K::Card),
        plain("name", Text),
        plain("pos", Number),
    ],
    create_required: &["idCard"],
    deletable: true,
};

static CHECK_ITEM: Schema = Schema {
    kind: K::CheckItem,
    fields: &[
        plain("id", FieldType::Id),
        one("idChecklist", "checklist", K::Checklist),
        plain("name", Text),
        plain("nameData", Json),
        plain("pos", Number),
        plain("state", Text),
    ],
    create_required: &["name", "idChecklist"],
    deletable: true,
};

static LABEL: Schema = Schema {
    kind: K::Label,
    fields: &[
        plain("id", FieldType::Id),
        plain("color", Text),
        one("idBoard", "board", K::Board),
        plain("name", Text),
        plain("uses", Number),
    ],
    create_required: &["idBoard"],
    deletable: true,
};

pub fn schema(kind: ResourceKind) -> &'static Schema {
    match kind {
        ResourceKind::Organization => &ORGANIZATION,
        ResourceKind::Board => &BOARD,
        ResourceKind::List => &LIST,
        ResourceKind::Card => &CARD,
        ResourceKind::Checklist => &CHECKLIST,
        ResourceKind::CheckItem => &CHECK_ITEM,
        ResourceKind::Label => &LABEL,
    }
}
