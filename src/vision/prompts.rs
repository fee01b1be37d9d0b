//! Prompt construction for the locate/center modes.

use crate::vision::bounding_box::BoxSpace;

pub const BOUNDING_BOX_MARKER: &str = "BOUNDING BOX: ";

/// Instruction asking the model to locate `target`, in the format `BoxParser` accepts.
///
/// With a marker the model may think out loud first; without one the whole reply must be
/// the box.
pub fn locate_prompt(
    target: &str,
    space: BoxSpace,
    marker: Option<&str>,
    width: u32,
    height: u32,
) -> String {
    let mut prompt = format!("\nLocate the following object within the image: \"{}\"\n", target);

    match space {
        BoxSpace::Normalized => prompt.push_str(
            "Return a 4-element NORMALIZED bounding box around the object:\n\
             [x_min, y_min, x_max, y_max]\n\
             Where x_min, y_min, x_max, and y_max are all between 0 and 1 \
             from the top left corner of the image.\n",
        ),
        BoxSpace::Pixel => prompt.push_str(&format!(
            "Return a 4-element bounding box around the object in PIXEL coordinates:\n\
             [x_min, y_min, x_max, y_max]\n\
             Where x_min and x_max are between 0 and {} and y_min and y_max are between 0 and {}, \
             measured from the top left corner of the image.\n",
            width, height
        )),
    }

    prompt.push_str("If you can't find the object, output null.\n");

    match marker {
        Some(marker) => prompt.push_str(&format!(
            "Feel free to use scratch space to think about the answer.\n\
             When you're ready to output the answer, prefix it with the string \"{marker}\".\n\
             Please only output a valid 4-element array or `null`, \
             no other text after \"{marker}\".\n",
            marker = marker
        )),
        None => prompt.push_str("Output only the 4-element array or `null`, with no other text.\n"),
    }

    prompt
}
