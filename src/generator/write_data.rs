//! The generator for write_data targets.
//!
//! A write_data target serializes a declared value into exactly one
//! literal output file at build-description time; placeholders make no
//! sense here and are rejected.

use super::{extract, GenerateError, TargetGenerator};
use crate::core::target::{OutputConversion, WriteDataValues};

pub(super) fn fill(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    generator.fill_outputs(false)?;
    if generator.target.outputs.len() != 1 {
        return Err(GenerateError::OutputCountMismatch {
            expected: 1,
            found: generator.target.outputs.len(),
            origin: generator.decl_origin,
        });
    }

    let Some(contents) = generator.scope.get("contents", true).cloned() else {
        return Err(GenerateError::MissingField {
            field: "contents",
            target_type: "write_data",
            origin: generator.decl_origin,
        });
    };

    let conversion = match generator.scope.get("output_conversion", true).cloned() {
        Some(value) => {
            let keyword = extract::expect_string(&value, "output_conversion")?;
            OutputConversion::parse(keyword).ok_or_else(|| {
                GenerateError::UnknownOutputConversion {
                    value: keyword.to_string(),
                    origin: value.origin,
                }
            })?
        }
        None => OutputConversion::Default,
    };

    generator.target.write_data_values = Some(WriteDataValues {
        contents,
        conversion,
    });
    Ok(())
}
