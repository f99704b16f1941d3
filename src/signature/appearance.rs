use std::path::Path;

use crate::document::{Document, ObjectKind};
use crate::error::Result;
use crate::object::Object;
use crate::signature::ports::ImageEmbedder;

/// Builds the Adobe four-object digital-signature appearance stack and
/// returns the outer form object's id, ready to be attached to the
/// annotation's `/AP << /N <id> >>`.
pub fn build(document: &mut Document, rect: [f64; 4], image_path: &Path, embedder: &dyn ImageEmbedder) -> Result<crate::object::ObjectId> {
    let width = rect[2] - rect[0];
    let height = rect[3] - rect[1];
    let bbox = Object::array(vec![
        Object::Real(0.0),
        Object::Real(0.0),
        Object::Real(width),
        Object::Real(height),
    ]);

    let n0 = crate::dictionary! {
        "Type" => Object::name("XObject"),
        "Subtype" => Object::name("Form"),
        "FormType" => Object::Integer(1),
        "BBox" => bbox.clone(),
    };
    let layer_n0 = document.create_object(
        Object::Stream(crate::object::Stream::new(n0, b"% DSBlank\n".to_vec())),
        ObjectKind::Plain,
    );

    let appearance = embedder.embed(image_path, rect)?;
    let mut n2_dict = crate::dictionary! {
        "Type" => Object::name("XObject"),
        "Subtype" => Object::name("Form"),
        "FormType" => Object::Integer(1),
        "BBox" => bbox.clone(),
    };
    for (key, value) in appearance.resources.iter() {
        n2_dict.set(key.clone(), value.clone());
    }
    let layer_n2 = document.create_object(
        Object::Stream(crate::object::Stream::new(n2_dict, appearance.command)),
        ObjectKind::Plain,
    );

    let container_resources = crate::dictionary! {
        "XObject" => crate::dictionary! {
            "n0" => Object::reference(layer_n0),
            "n2" => Object::reference(layer_n2),
        },
    };
    let container_dict = crate::dictionary! {
        "Type" => Object::name("XObject"),
        "Subtype" => Object::name("Form"),
        "FormType" => Object::Integer(1),
        "BBox" => bbox.clone(),
        "Resources" => container_resources,
    };
    let container_stream = b"q 1 0 0 1 0 0 cm /n0 Do Q\nq 1 0 0 1 0 0 cm /n2 Do Q\n".to_vec();
    let container_form = document.create_object(
        Object::Stream(crate::object::Stream::new(container_dict, container_stream)),
        ObjectKind::Plain,
    );

    let form_group = crate::dictionary! {
        "S" => Object::name("Transparency"),
        "CS" => Object::name("DeviceRGB"),
    };
    let form_resources = crate::dictionary! {
        "XObject" => crate::dictionary! {
            "FRM" => Object::reference(container_form),
        },
    };
    let form_dict = crate::dictionary! {
        "Type" => Object::name("XObject"),
        "Subtype" => Object::name("Form"),
        "FormType" => Object::Integer(1),
        "BBox" => bbox,
        "Group" => form_group,
        "Resources" => form_resources,
    };
    let form_object = document.create_object(
        Object::Stream(crate::object::Stream::new(form_dict, b"/FRM Do".to_vec())),
        ObjectKind::Plain,
    );

    Ok(form_object)
}
