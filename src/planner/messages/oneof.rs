use log::debug;

use super::super::{Placement, Resolution, UnionPlan, VariantPayload, VariantPlan};
use super::{inline_target, member_names};
use crate::annotations::Discriminator;
use crate::context::Context;
use crate::error::Error;
use crate::ident::{to_json_name, to_upper_camel};
use crate::walker::{FieldId, MessageId, OneofId};

/// The discriminator literal of one oneof case and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VariantLiteral {
    pub field: FieldId,
    pub case: String,
    pub literal: String,
    /// Set by a `variants` entry of the oneof's own annotation.
    pub config_literal: Option<String>,
    /// Set by `oneof_value` on the member field.
    pub field_literal: Option<String>,
}

/// Literals for every member of `oneof`, in declaration order: the oneof-level mapping if
/// present, else the member's `oneof_value`, else the case name.
pub(crate) fn variant_literals(
    ctx: &Context,
    oneof: OneofId,
    discriminator: &Discriminator,
) -> Vec<VariantLiteral> {
    let schema = ctx.schema();
    schema
        .oneof(oneof)
        .fields
        .iter()
        .map(|&field| {
            let case = schema.field(field).field_name.clone();
            let config_literal = discriminator
                .variants
                .iter()
                .find(|variant| variant.case == case)
                .map(|variant| variant.value.clone());
            let field_literal = ctx.annotations().field(field).oneof_value.clone();
            let literal = config_literal
                .clone()
                .or_else(|| field_literal.clone())
                .unwrap_or_else(|| case.clone());
            VariantLiteral {
                field,
                case,
                literal,
                config_literal,
                field_literal,
            }
        })
        .collect()
}

/// Returns the message whose fields a variant of a flattened union splices into the parent
/// object, or why that variant cannot be flattened.
pub(crate) fn flattened_variant(ctx: &Context, field: FieldId) -> Result<MessageId, &'static str> {
    let element = ctx.schema().field(field);
    if !element.is_message() {
        return Err("flatten requires message variants");
    }
    let target = element
        .message_target()
        .ok_or("flatten target type is not resolved")?;
    inline_target(ctx, target)
}

/// Returns `true` if `oneof` is a real oneof carrying a discriminator annotation.
pub(crate) fn is_discriminated(ctx: &Context, oneof: OneofId) -> bool {
    !ctx.schema().oneof(oneof).synthetic && ctx.annotations().oneof(oneof).discriminator.is_some()
}

impl Resolution {
    pub(in crate::planner) fn build_union_plan(
        &self,
        oneof: OneofId,
    ) -> Result<Option<UnionPlan>, Error> {
        let ctx = &self.ctx;
        let schema = ctx.schema();
        if !is_discriminated(ctx, oneof) {
            return Ok(None);
        }
        let discriminator = match &ctx.annotations().oneof(oneof).discriminator {
            Some(discriminator) => discriminator,
            None => return Ok(None),
        };
        let element = schema.oneof(oneof);
        let parent = schema.message(element.message);

        // Several unions on one message are never multiplied out; each is intersected.
        let discriminated = parent
            .oneofs
            .iter()
            .filter(|&&other| is_discriminated(ctx, other))
            .count();
        let placement = if discriminator.flatten || discriminated > 1 {
            Placement::Intersected
        } else {
            Placement::Property(to_json_name(&element.oneof_name))
        };

        let mut variants = Vec::with_capacity(element.fields.len());
        for variant in variant_literals(ctx, oneof, discriminator) {
            let field = self.plan_field(variant.field)?;
            // Rejected variants stay nested; the validator blocks their file.
            let inlined = if discriminator.flatten {
                flattened_variant(ctx, variant.field).ok()
            } else {
                None
            };
            let payload = match inlined {
                Some(target) => VariantPayload::Flattened(
                    self.plan_members(member_names(ctx, target), Some(variant.field))?,
                ),
                None => VariantPayload::Nested {
                    property: field.json_name.clone(),
                    plan: field.clone(),
                },
            };
            variants.push(VariantPlan {
                case: variant.case,
                literal: variant.literal,
                field,
                payload,
            });
        }

        debug!(
            "planned union {} with {} variant(s) on `{}`",
            element.name,
            variants.len(),
            discriminator.name
        );
        Ok(Some(UnionPlan {
            name: element.name.clone(),
            type_name: format!(
                "{}{}",
                parent.message_name(),
                to_upper_camel(&element.oneof_name)
            ),
            discriminator: discriminator.name.clone(),
            flatten: discriminator.flatten,
            placement,
            variants,
        }))
    }
}
