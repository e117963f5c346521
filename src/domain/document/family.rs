//! Node family taxonomy
//!
//! Every node `type` tag the engine understands belongs to one family. The
//! table below is the single source of truth for canonical tags, versions and
//! lookup aliases; the validator and the fixer both resolve through it.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Coarse grouping of node families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Trigger,
    Conditional,
    Transform,
    Code,
    Flow,
    Loop,
    Http,
    Messaging,
    Email,
    Spreadsheet,
    FileStorage,
    Database,
    Ai,
    Response,
    NoOp,
    Annotation,
}

/// Known node families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFamily {
    ManualTrigger,
    ScheduleTrigger,
    WebhookTrigger,
    EmailTrigger,
    EmailReadImap,
    FormTrigger,
    ChatTrigger,
    ErrorTrigger,
    ExecuteWorkflowTrigger,
    If,
    Switch,
    Filter,
    Set,
    Code,
    Merge,
    SplitInBatches,
    SplitOut,
    Aggregate,
    Wait,
    DateTime,
    HttpRequest,
    Slack,
    Telegram,
    Discord,
    Gmail,
    EmailSend,
    GoogleSheets,
    GoogleDrive,
    Airtable,
    Notion,
    Postgres,
    OpenAi,
    AiAgent,
    LmChatOpenAi,
    RespondToWebhook,
    NoOp,
    StickyNote,
}

/// Static description of a family
#[derive(Debug, Clone, Copy)]
pub struct FamilySpec {
    pub family: NodeFamily,
    pub type_tag: &'static str,
    pub category: NodeCategory,
    pub type_version: f64,
    /// The engine only imports this family at exactly `type_version`
    pub exact_version: bool,
    pub requires_credentials: bool,
    /// Parameters carry `__rl` resource-locator objects
    pub resource_locator: bool,
    pub aliases: &'static [&'static str],
}

const fn spec(
    family: NodeFamily,
    type_tag: &'static str,
    category: NodeCategory,
    type_version: f64,
) -> FamilySpec {
    FamilySpec {
        family,
        type_tag,
        category,
        type_version,
        exact_version: false,
        requires_credentials: false,
        resource_locator: false,
        aliases: &[],
    }
}

impl FamilySpec {
    const fn exact(mut self) -> Self {
        self.exact_version = true;
        self
    }

    const fn credentials(mut self) -> Self {
        self.requires_credentials = true;
        self
    }

    const fn locator(mut self) -> Self {
        self.resource_locator = true;
        self
    }

    const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }
}

use NodeCategory as C;
use NodeFamily as F;

static FAMILIES: &[FamilySpec] = &[
    spec(F::ManualTrigger, "n8n-nodes-base.manualTrigger", C::Trigger, 1.0)
        .aliases(&["start", "n8n-nodes-base.start", "manual"]),
    spec(F::ScheduleTrigger, "n8n-nodes-base.scheduleTrigger", C::Trigger, 1.2)
        .aliases(&["cron", "n8n-nodes-base.cron", "interval", "n8n-nodes-base.interval", "schedule"]),
    spec(F::WebhookTrigger, "n8n-nodes-base.webhook", C::Trigger, 2.0)
        .aliases(&["webhooktrigger"]),
    spec(F::EmailTrigger, "n8n-nodes-base.gmailTrigger", C::Trigger, 1.2)
        .credentials()
        .aliases(&["gmail-trigger", "gmail_trigger"]),
    spec(F::EmailReadImap, "n8n-nodes-base.emailReadImap", C::Trigger, 2.0)
        .credentials()
        .aliases(&["imap", "emailtrigger"]),
    spec(F::FormTrigger, "n8n-nodes-base.formTrigger", C::Trigger, 2.2),
    spec(F::ChatTrigger, "@n8n/n8n-nodes-langchain.chatTrigger", C::Trigger, 1.1),
    spec(F::ErrorTrigger, "n8n-nodes-base.errorTrigger", C::Trigger, 1.0),
    spec(F::ExecuteWorkflowTrigger, "n8n-nodes-base.executeWorkflowTrigger", C::Trigger, 1.1),
    spec(F::If, "n8n-nodes-base.if", C::Conditional, 2.0).exact(),
    spec(F::Switch, "n8n-nodes-base.switch", C::Conditional, 3.0).exact(),
    spec(F::Filter, "n8n-nodes-base.filter", C::Conditional, 2.0).exact(),
    spec(F::Set, "n8n-nodes-base.set", C::Transform, 3.4)
        .exact()
        .aliases(&["editfields", "edit-fields"]),
    spec(F::Code, "n8n-nodes-base.code", C::Code, 2.0)
        .exact()
        .aliases(&["function", "n8n-nodes-base.function", "functionitem", "n8n-nodes-base.functionitem"]),
    spec(F::Merge, "n8n-nodes-base.merge", C::Flow, 3.0),
    spec(F::SplitInBatches, "n8n-nodes-base.splitInBatches", C::Loop, 3.0)
        .aliases(&["loopoveritems", "loop"]),
    spec(F::SplitOut, "n8n-nodes-base.splitOut", C::Transform, 1.0),
    spec(F::Aggregate, "n8n-nodes-base.aggregate", C::Transform, 1.0),
    spec(F::Wait, "n8n-nodes-base.wait", C::Flow, 1.1),
    spec(F::DateTime, "n8n-nodes-base.dateTime", C::Transform, 2.0),
    spec(F::HttpRequest, "n8n-nodes-base.httpRequest", C::Http, 4.2)
        .exact()
        .aliases(&["http", "httprequest", "http-request", "http_request"]),
    spec(F::Slack, "n8n-nodes-base.slack", C::Messaging, 2.2)
        .credentials()
        .locator(),
    spec(F::Telegram, "n8n-nodes-base.telegram", C::Messaging, 1.2).credentials(),
    spec(F::Discord, "n8n-nodes-base.discord", C::Messaging, 2.0).credentials(),
    spec(F::Gmail, "n8n-nodes-base.gmail", C::Email, 2.1).credentials(),
    spec(F::EmailSend, "n8n-nodes-base.emailSend", C::Email, 2.1)
        .credentials()
        .aliases(&["sendemail", "send-email", "smtp"]),
    spec(F::GoogleSheets, "n8n-nodes-base.googleSheets", C::Spreadsheet, 4.5)
        .credentials()
        .locator()
        .aliases(&["sheets", "google-sheets", "googlesheet"]),
    spec(F::GoogleDrive, "n8n-nodes-base.googleDrive", C::FileStorage, 3.0)
        .credentials()
        .locator(),
    spec(F::Airtable, "n8n-nodes-base.airtable", C::Spreadsheet, 2.1)
        .credentials()
        .locator(),
    spec(F::Notion, "n8n-nodes-base.notion", C::Database, 2.2)
        .credentials()
        .locator(),
    spec(F::Postgres, "n8n-nodes-base.postgres", C::Database, 2.5).credentials(),
    spec(F::OpenAi, "@n8n/n8n-nodes-langchain.openAi", C::Ai, 1.8)
        .credentials()
        .locator()
        .aliases(&["n8n-nodes-base.openai", "chatgpt", "gpt"]),
    spec(F::AiAgent, "@n8n/n8n-nodes-langchain.agent", C::Ai, 1.7)
        .aliases(&["aiagent", "ai-agent"]),
    spec(F::LmChatOpenAi, "@n8n/n8n-nodes-langchain.lmChatOpenAi", C::Ai, 1.2)
        .credentials()
        .locator(),
    spec(F::RespondToWebhook, "n8n-nodes-base.respondToWebhook", C::Response, 1.1),
    spec(F::NoOp, "n8n-nodes-base.noOp", C::NoOp, 1.0).aliases(&["nooperation", "no-op"]),
    spec(F::StickyNote, "n8n-nodes-base.stickyNote", C::Annotation, 1.0).aliases(&["note"]),
];

/// Lowercased tag, short name and alias -> family
static LOOKUP: Lazy<HashMap<String, NodeFamily>> = Lazy::new(|| {
    let mut map = HashMap::new();

    for spec in FAMILIES {
        map.insert(spec.type_tag.to_lowercase(), spec.family);
        map.insert(short_name(spec.type_tag).to_lowercase(), spec.family);

        for alias in spec.aliases {
            map.insert(alias.to_lowercase(), spec.family);
        }
    }

    map
});

fn short_name(tag: &str) -> &str {
    tag.rsplit('.').next().unwrap_or(tag)
}

impl NodeFamily {
    /// Resolve a raw type tag, tolerating casing and package-prefix mistakes
    pub fn resolve(tag: &str) -> Option<Self> {
        let lowered = tag.trim().to_lowercase();

        if lowered.is_empty() {
            return None;
        }

        if let Some(family) = LOOKUP.get(&lowered) {
            return Some(*family);
        }

        LOOKUP.get(short_name(&lowered)).copied()
    }

    /// Exact match against the canonical tag (no normalisation)
    pub fn from_canonical(tag: &str) -> Option<Self> {
        FAMILIES
            .iter()
            .find(|spec| spec.type_tag == tag)
            .map(|spec| spec.family)
    }

    pub fn all() -> impl Iterator<Item = NodeFamily> {
        FAMILIES.iter().map(|spec| spec.family)
    }

    pub fn spec(&self) -> &'static FamilySpec {
        FAMILIES
            .iter()
            .find(|spec| spec.family == *self)
            .unwrap_or(&FAMILIES[0])
    }

    pub fn type_tag(&self) -> &'static str {
        self.spec().type_tag
    }

    pub fn category(&self) -> NodeCategory {
        self.spec().category
    }

    pub fn default_type_version(&self) -> f64 {
        self.spec().type_version
    }

    pub fn exact_type_version(&self) -> Option<f64> {
        let spec = self.spec();
        spec.exact_version.then_some(spec.type_version)
    }

    pub fn requires_credentials(&self) -> bool {
        self.spec().requires_credentials
    }

    pub fn uses_resource_locator(&self) -> bool {
        self.spec().resource_locator
    }

    pub fn is_trigger(&self) -> bool {
        self.category() == NodeCategory::Trigger
    }

    pub fn is_branching(&self) -> bool {
        self.category() == NodeCategory::Conditional
    }

    pub fn is_loop(&self) -> bool {
        self.category() == NodeCategory::Loop
    }

    /// Nodes that never take part in the connection graph
    pub fn is_annotation(&self) -> bool {
        self.category() == NodeCategory::Annotation
    }
}

impl fmt::Display for NodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_tag())
    }
}
