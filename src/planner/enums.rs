use log::debug;

use super::{EnumPlan, EnumValuePlan, Resolution};
use crate::walker::EnumId;

impl Resolution {
    pub(super) fn build_enum_plan(&self, enumeration: EnumId) -> EnumPlan {
        let schema = self.schema();
        let annotations = self.ctx.annotations();
        let element = schema.enumeration(enumeration);

        let values = element
            .values
            .iter()
            .map(|&id| {
                let value = schema.enum_value(id);
                let literal = annotations
                    .enum_value(id)
                    .name
                    .clone()
                    .unwrap_or_else(|| value.value_name.clone());
                EnumValuePlan {
                    name: value.value_name.clone(),
                    number: value.number,
                    literal,
                }
            })
            .collect::<Vec<_>>();

        debug!("planned enum {} with {} value(s)", element.name, values.len());
        EnumPlan {
            name: element.name.clone(),
            encoding: annotations
                .enumeration(enumeration)
                .encoding
                .unwrap_or_default(),
            values,
        }
    }
}
