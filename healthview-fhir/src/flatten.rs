//! Recursive flattening of a FHIR resource into an ordered fragment list.

use std::mem;
use std::rc::Rc;

use healthview_core::{
    profile_id, Fragment, LabelResolver, ProfileSearch, RenderConfig, RenderError, Terminology,
};
use serde_json::{Map, Value};

use crate::constraints::Constraints;
use crate::dates::normalize_date;
use crate::handlers::{self, clinical, extension, person, scalar_text, Continuation, HandlerContext};
use crate::matchers::{self, last_segment, Datatype};

/// Lookup services and settings shared, read-only, by every handler.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub labels: &'a dyn LabelResolver,
    pub terminology: &'a dyn Terminology,
    pub profiles: &'a dyn ProfileSearch,
    pub config: &'a RenderConfig,
}

impl<'a> Services<'a> {
    pub fn new(
        labels: &'a dyn LabelResolver,
        terminology: &'a dyn Terminology,
        profiles: &'a dyn ProfileSearch,
        config: &'a RenderConfig,
    ) -> Self {
        Self {
            labels,
            terminology,
            profiles,
            config,
        }
    }
}

/// Walks one resource and collects its fragments. Create one per resource.
pub struct JsonFlattener<'a> {
    services: Services<'a>,
    constraints: Rc<Constraints>,
    rows: Vec<Fragment>,
}

impl<'a> JsonFlattener<'a> {
    pub fn new(services: Services<'a>) -> Self {
        Self {
            services,
            constraints: Rc::new(Constraints::for_profile(services.config, "")),
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[Fragment] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Fragment> {
        self.rows
    }

    /// Flatten `resource` with `resource_type` as root path.
    #[tracing::instrument(name = "flatten", skip(self, resource), fields(rows = tracing::field::Empty))]
    pub fn start_flattening(
        &mut self,
        resource: &Value,
        resource_type: &str,
        profile: &str,
    ) -> Result<(), RenderError> {
        let profile = profile_id(profile);
        self.constraints = Rc::new(Constraints::for_profile(self.services.config, profile));

        let started = self.rows.len();
        self.flatten(resource, resource_type, profile)?;
        tracing::Span::current().record("rows", self.rows.len() - started);
        tracing::debug!("resource flattened");
        Ok(())
    }

    /// Dispatch on the runtime shape of `node`.
    pub fn flatten(&mut self, node: &Value, path: &str, profile: &str) -> Result<(), RenderError> {
        if !self.constraints.allows(path) {
            tracing::trace!(path, "suppressed by constraints");
            return Ok(());
        }
        match node {
            Value::Object(map) => self.flatten_object(map, path, profile),
            Value::Array(items) => self.flatten_list(items, path, profile),
            scalar => {
                self.handle_property(scalar, path, profile);
                Ok(())
            }
        }
    }

    fn flatten_object(
        &mut self,
        node: &Map<String, Value>,
        path: &str,
        profile: &str,
    ) -> Result<(), RenderError> {
        match matchers::classify(node, path) {
            Some(datatype) => self.dispatch(datatype, node, path, profile),
            None => self.iter_object(node, path, profile),
        }
    }

    fn dispatch(
        &mut self,
        datatype: Datatype,
        node: &Map<String, Value>,
        path: &str,
        profile: &str,
    ) -> Result<(), RenderError> {
        let constraints = Rc::clone(&self.constraints);
        let ctx = HandlerContext::new(path, profile, self.services, &constraints);
        match datatype {
            Datatype::Extension => {
                let emitted = extension::handle(&ctx, node, self)?;
                self.rows.extend(emitted);
            }
            Datatype::HumanName => person::handle_name(&ctx, node, self)?,
            Datatype::ContactPoint => person::handle_contact_point(&ctx, node, self)?,
            Datatype::Address => person::handle_address(&ctx, node, self)?,
            Datatype::Communication => person::handle_communication(&ctx, node, self)?,
            Datatype::Activity => clinical::handle_activity(&ctx, node, self)?,
            Datatype::ReferenceRange => clinical::handle_reference_range(&ctx, node, self)?,
            terminating => {
                if let Some(rows) = handlers::render_terminating(terminating, &ctx, node) {
                    self.rows.extend(rows?);
                }
                if terminating == Datatype::TimingRepeat {
                    if let Some(extension) = node.get("extension") {
                        self.flatten(extension, &format!("{path}.extension"), profile)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Generic object: every field in document order.
    fn iter_object(
        &mut self,
        node: &Map<String, Value>,
        path: &str,
        profile: &str,
    ) -> Result<(), RenderError> {
        for (key, value) in node {
            let child = format!("{path}.{key}");
            if key.starts_with("div") {
                if !self.constraints.allows(&child) {
                    tracing::trace!(path = %child, "narrative suppressed by constraints");
                    continue;
                }
                let content = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                self.rows.push(Fragment::narrative(&content));
            } else if key.starts_with("contained") {
                self.handle_contained(value, &child, profile)?;
            } else {
                self.flatten(value, &child, profile)?;
            }
        }
        Ok(())
    }

    /// Contained resources render under their own type, each in a section.
    fn handle_contained(&mut self, value: &Value, path: &str, profile: &str) -> Result<(), RenderError> {
        if !self.constraints.allows(path) {
            return Ok(());
        }
        let Value::Array(resources) = value else {
            return self.flatten(value, path, profile);
        };
        for resource in resources {
            let resource_type = resource
                .get("resourceType")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let root = if resource_type.is_empty() { path } else { resource_type };
            let contained_profile = crate::resource_profile(resource).unwrap_or(profile);

            self.rows.push(Fragment::SubHead(resource_type.to_string()));
            self.flatten(resource, root, contained_profile)?;
            self.rows.push(Fragment::EndSubHead);
        }
        Ok(())
    }

    fn flatten_list(&mut self, items: &[Value], path: &str, profile: &str) -> Result<(), RenderError> {
        let config = self.services.config;
        if matchers::is_relationship(items, &config.relationship_systems) {
            let constraints = Rc::clone(&self.constraints);
            let ctx = HandlerContext::new(path, profile, self.services, &constraints);
            self.rows.extend(clinical::handle_relationship(&ctx, items));
            return Ok(());
        }
        if config.is_section_key(last_segment(path)) {
            self.create_section(items, path, profile)
        } else {
            self.iter_list(items, path, profile)
        }
    }

    fn create_section(&mut self, items: &[Value], path: &str, profile: &str) -> Result<(), RenderError> {
        let head = self.section_label(path, profile);
        self.rows.push(Fragment::SubHead(head));
        self.iter_list(items, path, profile)?;
        self.rows.push(Fragment::EndSubHead);
        Ok(())
    }

    /// Header label, preferring the sub-profile that governs `path`.
    fn section_label(&self, path: &str, profile: &str) -> String {
        let labels = self.services.labels;
        match self.services.profiles.search(profile, path) {
            Some(found) if !found.profile.is_empty() && !found.base_path.is_empty() => {
                labels.label(&found.profile, &found.base_path)
            }
            _ => labels.label(profile, path),
        }
    }

    fn iter_list(&mut self, items: &[Value], path: &str, profile: &str) -> Result<(), RenderError> {
        let divide = self.services.config.is_divider_key(last_segment(path));
        for item in items {
            self.flatten(item, path, profile)?;
            if divide {
                self.rows.push(Fragment::Divider);
            }
        }
        Ok(())
    }

    fn handle_property(&mut self, value: &Value, path: &str, profile: &str) {
        let label = self.services.labels.label(profile, path);
        let raw = scalar_text(value).unwrap_or_default();
        let text = if self.services.config.normalize_dates {
            normalize_date(&raw)
        } else {
            raw
        };
        self.rows.push(Fragment::row(label, text));
    }
}

impl Continuation for JsonFlattener<'_> {
    fn emit(&mut self, fragment: Fragment) {
        self.rows.push(fragment);
    }

    fn descend(&mut self, value: &Value, path: &str, profile: &str) -> Result<(), RenderError> {
        self.flatten(value, path, profile)
    }

    fn capture(
        &mut self,
        value: &Value,
        path: &str,
        profile: &str,
    ) -> Result<Vec<Fragment>, RenderError> {
        let outer = mem::take(&mut self.rows);
        let result = self.flatten(value, path, profile);
        let captured = mem::replace(&mut self.rows, outer);
        result.map(|()| captured)
    }

    fn allows(&self, path: &str) -> bool {
        self.constraints.allows(path)
    }
}
