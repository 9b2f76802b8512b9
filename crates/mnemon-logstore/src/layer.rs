//! Tee layer: forwards every `tracing` record to an inner layer and persists
//! it in a [`LogStore`].
//!
//! # Scope attributes
//!
//! Each span carries a [`Scope`] snapshot in its extensions: a copy of the
//! parent's string attributes with the span's own string fields applied on
//! top, plus the group path of span names. Events resolve `server_id` and
//! `channel_id` from the snapshot of the span they occur in, then let fields
//! on the event itself override them.
//!
//! Snapshots are taken when a span is created, so sibling spans never see
//! each other's attributes and a child never changes its parent.
//!
//! Identifiers recorded with `?` lose one pair of surrounding quotes, so
//! `server_id = ?id`, `server_id = %id` and `server_id = id.as_str()` all
//! store the same value for a string id.
//!
//! Fields added by the `log` bridge (`log.target`, `log.file`, ...) are
//! dropped; the record's level and message are kept.
//!
//! # Failure model
//!
//! The inner layer always sees the record first. The store write that follows
//! is best-effort and cannot affect the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use crate::store::LogStore;
use crate::types::{LogInsert, LogLevel};

/// Field holding the originating server.
pub const SERVER_ID_FIELD: &str = "server_id";

/// Field holding the originating channel.
pub const CHANNEL_ID_FIELD: &str = "channel_id";

/// Attributes accumulated along a span's ancestry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    attrs: BTreeMap<&'static str, String>,
    groups: Vec<&'static str>,
}

impl Scope {
    /// Derive the scope of a child span named `name`.
    #[must_use]
    pub fn child(&self, name: &'static str) -> Self {
        let mut scope = self.clone();
        scope.groups.push(name);
        scope
    }

    /// Set an attribute; the last write for a key wins.
    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        let _ = self.attrs.insert(key, value.into());
    }

    /// Value of an accumulated attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Span names from the root to this scope.
    pub fn groups(&self) -> &[&'static str] {
        &self.groups
    }
}

/// Prefix of the fields `tracing-log` attaches to bridged `log` records.
const LOG_BRIDGE_PREFIX: &str = "log.";

/// Debug rendering with one pair of surrounding quotes removed.
fn unquoted_debug(value: &dyn std::fmt::Debug) -> String {
    let rendered = format!("{value:?}");
    match rendered
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner.to_string(),
        None => rendered,
    }
}

/// Keeps string-valued span fields. Numbers and booleans are not carried.
struct ScopeVisitor<'a> {
    scope: &'a mut Scope,
}

impl Visit for ScopeVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.scope.set(field.name(), value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.scope.set(field.name(), unquoted_debug(value));
    }

    fn record_i64(&mut self, _field: &Field, _value: i64) {}

    fn record_u64(&mut self, _field: &Field, _value: u64) {}

    fn record_i128(&mut self, _field: &Field, _value: i128) {}

    fn record_u128(&mut self, _field: &Field, _value: u128) {}

    fn record_f64(&mut self, _field: &Field, _value: f64) {}

    fn record_bool(&mut self, _field: &Field, _value: bool) {}
}

/// Splits an event into message, identifiers and remaining attributes.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    server_id: Option<String>,
    channel_id: Option<String>,
    attrs: serde_json::Map<String, Value>,
}

impl EventVisitor {
    fn record_value(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => self.message = Some(value_to_string(value)),
            SERVER_ID_FIELD => self.server_id = Some(value_to_string(value)),
            CHANNEL_ID_FIELD => self.channel_id = Some(value_to_string(value)),
            name if name.starts_with(LOG_BRIDGE_PREFIX) => {}
            name => {
                let _ = self.attrs.insert(name.to_string(), value);
            }
        }
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = match field.name() {
            SERVER_ID_FIELD | CHANNEL_ID_FIELD => unquoted_debug(value),
            _ => format!("{value:?}"),
        };
        self.record_value(field, Value::String(rendered));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::Number(value.into()));
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        let value = i64::try_from(value)
            .map_or_else(|_| Value::String(value.to_string()), Value::from);
        self.record_value(field, value);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        let value = u64::try_from(value)
            .map_or_else(|_| Value::String(value.to_string()), Value::from);
        self.record_value(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        match serde_json::Number::from_f64(value) {
            Some(n) => self.record_value(field, Value::Number(n)),
            None => self.record_value(field, Value::String(value.to_string())),
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::Bool(value));
    }
}

/// A layer that tees every record to `inner` and to a [`LogStore`].
///
/// The tee adds no filtering of its own: enablement and callsite interest are
/// whatever the inner layer decides.
pub struct TeeLayer<L> {
    inner: L,
    store: Arc<LogStore>,
}

impl<L> TeeLayer<L> {
    /// Wrap `inner`, persisting every record it accepts into `store`.
    pub fn new(inner: L, store: Arc<LogStore>) -> Self {
        Self { inner, store }
    }

    /// The wrapped layer.
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// The store records are persisted to.
    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }
}

impl<S, L> Layer<S> for TeeLayer<L>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    L: Layer<S>,
{
    fn on_layer(&mut self, subscriber: &mut S) {
        self.inner.on_layer(subscriber);
    }

    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        self.inner.register_callsite(metadata)
    }

    fn enabled(&self, metadata: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        self.inner.enabled(metadata, ctx)
    }

    fn event_enabled(&self, event: &Event<'_>, ctx: Context<'_, S>) -> bool {
        self.inner.event_enabled(event, ctx)
    }

    fn max_level_hint(&self) -> Option<tracing::level_filters::LevelFilter> {
        self.inner.max_level_hint()
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        self.inner.on_new_span(attrs, id, ctx.clone());

        let Some(span) = ctx.span(id) else {
            return;
        };
        let parent_scope = span.parent().and_then(|parent| {
            let extensions = parent.extensions();
            extensions.get::<Scope>().cloned()
        });
        let mut scope = parent_scope.unwrap_or_default().child(span.name());
        attrs.record(&mut ScopeVisitor { scope: &mut scope });

        let _ = span.extensions_mut().replace(scope);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        self.inner.on_record(id, values, ctx.clone());

        if let Some(span) = ctx.span(id) {
            let mut extensions = span.extensions_mut();
            if let Some(scope) = extensions.get_mut::<Scope>() {
                values.record(&mut ScopeVisitor { scope });
            }
        }
    }

    fn on_follows_from(&self, id: &Id, follows: &Id, ctx: Context<'_, S>) {
        self.inner.on_follows_from(id, follows, ctx);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.inner.on_event(event, ctx.clone());

        let (scope_server, scope_channel) = ctx.event_span(event).map_or((None, None), |span| {
            let extensions = span.extensions();
            scope_ids(extensions.get::<Scope>())
        });

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let attrs = if visitor.attrs.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&visitor.attrs).unwrap_or_default()
        };

        self.store.write(&LogInsert {
            ts: Utc::now(),
            level: LogLevel::from_tracing(event.metadata().level()),
            message: visitor.message.unwrap_or_default(),
            server_id: visitor.server_id.or(scope_server),
            channel_id: visitor.channel_id.or(scope_channel),
            attrs,
        });
    }

    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        self.inner.on_enter(id, ctx);
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        self.inner.on_exit(id, ctx);
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        self.inner.on_close(id, ctx);
    }

    fn on_id_change(&self, old: &Id, new: &Id, ctx: Context<'_, S>) {
        self.inner.on_id_change(old, new, ctx);
    }
}

fn scope_ids(scope: Option<&Scope>) -> (Option<String>, Option<String>) {
    scope.map_or((None, None), |scope| {
        (
            scope.get(SERVER_ID_FIELD).map(str::to_owned),
            scope.get(CHANNEL_ID_FIELD).map(str::to_owned),
        )
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
