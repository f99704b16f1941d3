pub mod appearance;
pub mod ports;

pub(crate) mod coordinator;

#[cfg(test)]
mod tests;

use std::path::Path;

use log::debug;
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::config::Config;
use crate::dictionary::Dictionary;
use crate::document::{Document, ObjectKind, PendingSignature};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId};
use crate::signature::ports::{CertLoader, ImageEmbedder, Pkcs7Signer};

/// Fixed-width placeholder for `/Contents`: `<` + `signature_hex_capacity`
/// zero hex digits + `>`. Patched in place once the final detached signature
/// is known — never resized, so every byte offset computed from the
/// first-pass layout stays valid.
pub(crate) fn contents_placeholder(capacity: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(capacity + 2);
    out.push(b'<');
    out.extend(std::iter::repeat(b'0').take(capacity));
    out.push(b'>');
    out
}

/// Fixed-width placeholder for `/ByteRange`'s value, reserved before the
/// final `[0 a b c]` string (whose width depends on the file size) is known.
pub(crate) fn byte_range_placeholder(capacity: usize) -> Vec<u8> {
    vec![b' '; capacity]
}

/// Seeds the fixed signature-dictionary keys around whatever the caller
/// passed to `create_object(_, ObjectKind::Signature)`.
pub(crate) fn seed_signature_dictionary(value: Object, config: &Config) -> Object {
    let mut dict = match value {
        Object::Dictionary(d) => d,
        _ => Dictionary::new(),
    };
    dict.set("Filter", Object::name("Adobe.PPKLite"));
    dict.set("Type", Object::name("Sig"));
    dict.set("SubFilter", Object::name("adbe.pkcs7.detached"));
    dict.set("ByteRange", Object::RawToken(byte_range_placeholder(config.byte_range_capacity)));
    dict.set("Contents", Object::RawToken(contents_placeholder(config.signature_hex_capacity)));
    dict.set("M", Object::string_literal(format_pdf_date(chrono::Local::now())));
    Object::Dictionary(dict)
}

/// `D:YYYYMMDDHHMMSS+HH'MM'`, the PDF date string form used by `/M` and
/// `/ModDate`.
fn format_pdf_date(now: chrono::DateTime<chrono::Local>) -> String {
    let offset = now.format("%z").to_string();
    let (sign_hours, minutes) = offset.split_at(3);
    format!("D:{}{sign_hours}'{minutes}'", now.format("%Y%m%d%H%M%S"))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Replaces the text content of the first `<tag>...</tag>` pair found in
/// `haystack`; returns the input unchanged if the tag is not present.
fn replace_tag_content(haystack: &[u8], tag: &str, value: &str) -> Vec<u8> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let Some(open_pos) = find_subslice(haystack, open.as_bytes()) else {
        return haystack.to_vec();
    };
    let content_start = open_pos + open.len();
    let Some(close_rel) = find_subslice(&haystack[content_start..], close.as_bytes()) else {
        return haystack.to_vec();
    };
    let close_pos = content_start + close_rel;

    let mut out = Vec::with_capacity(haystack.len());
    out.extend_from_slice(&haystack[..content_start]);
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(&haystack[close_pos..]);
    out
}

impl Document {
    /// Reserves a signature field on `page` at `rect` (in unrotated page
    /// space, `[x0 y0 x1 y1]`), wires it into `/AcroForm`, and registers a
    /// pending signature to be produced by `signer` on the next `emit`.
    /// `image` supplies the visible appearance stack; `None` leaves the
    /// field unsigned-looking until a viewer renders the default.
    ///
    /// Fails with `Error::AlreadyPrepared` if a signature is already
    /// pending. On any other failure, `overrides` is rolled back to its
    /// pre-call state.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_signature(
        &mut self,
        cert_loader: &dyn CertLoader,
        cert_bytes: &[u8],
        cert_password: &str,
        signer: Box<dyn Pkcs7Signer>,
        page: usize,
        rect: [f64; 4],
        image: Option<(&Path, &dyn ImageEmbedder)>,
    ) -> Result<()> {
        if self.pending_signature.is_some() {
            return Err(Error::AlreadyPrepared);
        }
        let snapshot = self.overrides.clone();
        match self.prepare_signature_inner(cert_loader, cert_bytes, cert_password, signer, page, rect, image) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.overrides = snapshot;
                Err(err)
            }
        }
    }

    fn prepare_signature_inner(
        &mut self,
        cert_loader: &dyn CertLoader,
        cert_bytes: &[u8],
        cert_password: &str,
        signer: Box<dyn Pkcs7Signer>,
        page: usize,
        rect: [f64; 4],
        image: Option<(&Path, &dyn ImageEmbedder)>,
    ) -> Result<()> {
        let cert_bundle = cert_loader
            .load(cert_bytes, cert_password)
            .map_err(|_| Error::CertLoad("certificate bundle could not be loaded".to_string()))?;

        let root_ref = self
            .trailer
            .get(b"Root")
            .map_err(|_| Error::MissingRoot)?
            .as_reference()
            .map_err(|_| Error::MissingRoot)?;
        let catalog = self.get_object(root_ref, false).ok_or(Error::MissingRoot)?;
        let catalog_dict = catalog.as_dict().map_err(|_| Error::MissingRoot)?.clone();

        let page_ref = self.get_page(page).ok_or(Error::InvalidPage(page))?.id;
        let media_box = self.page_size(page).ok_or(Error::InvalidPage(page))?;
        let pagesize_h = media_box[3] - media_box[1];

        debug!("allocating signature dictionary object");
        let signature_id = self.create_object(Object::Dictionary(Dictionary::new()), ObjectKind::Signature);

        let widget_name: String = {
            let rng = &mut self.config.widget_name_rng;
            rng.sample_iter(&Alphanumeric).take(8).map(char::from).collect()
        };

        let mut annot_dict = crate::dictionary! {
            "Type" => Object::name("Annot"),
            "Subtype" => Object::name("Widget"),
            "FT" => Object::name("Sig"),
            "V" => Object::reference(signature_id),
            "T" => Object::string_literal(format!("Signature{widget_name}")),
            "P" => Object::reference(page_ref),
            "Rect" => Object::array(vec![
                Object::Real(rect[0]),
                Object::Real(pagesize_h - rect[1]),
                Object::Real(rect[2]),
                Object::Real(pagesize_h - rect[3]),
            ]),
            "F" => Object::Integer(132),
        };

        debug!("allocating widget annotation object");
        let annot_id = self.create_object(Object::Dictionary(annot_dict.clone()), ObjectKind::Plain);

        if let Some((path, embedder)) = image {
            debug!("building signature appearance stack");
            let form_id = appearance::build(self, rect, path, embedder)?;
            annot_dict.set("AP", crate::dictionary! { "N" => Object::reference(form_id) });
            self.add_object(annot_id, Object::Dictionary(annot_dict));
        }

        debug!("attaching annotation to page /Annots");
        self.update_page_annots(page_ref, annot_id)?;

        debug!("attaching annotation to /AcroForm");
        self.update_acroform(root_ref, &catalog_dict, annot_id)?;

        if let Ok(Object::Reference(meta_ref)) = catalog_dict.get(b"Metadata") {
            debug!("rewriting XMP metadata dates");
            self.update_metadata(*meta_ref)?;
        }

        let mod_date = format_pdf_date(chrono::Local::now());
        debug!("updating /Info dictionary");
        self.update_info(&mod_date)?;

        self.pending_signature = Some(PendingSignature { signature_id, signer, cert_bundle });
        Ok(())
    }

    fn update_page_annots(&mut self, page_ref: ObjectId, annot_id: ObjectId) -> Result<()> {
        let page_obj = self.get_object(page_ref, false).ok_or(Error::InvalidTree)?;
        let mut page_dict = page_obj.as_dict().map_err(|_| Error::InvalidTree)?.clone();

        match page_dict.get(b"Annots") {
            Ok(Object::Array(items)) => {
                let mut items = items.clone();
                items.push(Object::reference(annot_id));
                let list_id = self.create_object(Object::Array(items), ObjectKind::Plain);
                page_dict.set("Annots", Object::reference(list_id));
            }
            Ok(Object::Reference(list_ref)) => {
                let list_ref = *list_ref;
                let list_obj = self.get_object(list_ref, false).ok_or(Error::InvalidTree)?;
                let mut items = list_obj.as_array().map_err(|_| Error::MixedReference)?.to_vec();
                items.push(Object::reference(annot_id));
                self.add_object(list_ref, Object::Array(items));
            }
            Ok(_) => return Err(Error::MixedReference),
            Err(_) => {
                let list_id = self.create_object(Object::array(vec![Object::reference(annot_id)]), ObjectKind::Plain);
                page_dict.set("Annots", Object::reference(list_id));
            }
        }

        self.add_object(page_ref, Object::Dictionary(page_dict));
        Ok(())
    }

    fn update_acroform(&mut self, catalog_ref: ObjectId, catalog_dict: &Dictionary, annot_id: ObjectId) -> Result<()> {
        match catalog_dict.get(b"AcroForm") {
            Ok(Object::Reference(acro_ref)) => {
                let acro_ref = *acro_ref;
                let acro_obj = self.get_object(acro_ref, false).ok_or(Error::MissingRoot)?;
                let mut acro_dict = acro_obj.as_dict().map_err(|_| Error::MissingRoot)?.clone();
                append_acroform_fields(&mut acro_dict, annot_id);
                self.add_object(acro_ref, Object::Dictionary(acro_dict));
            }
            Ok(Object::Dictionary(existing)) => {
                let mut acro_dict = existing.clone();
                append_acroform_fields(&mut acro_dict, annot_id);
                let mut catalog_dict = catalog_dict.clone();
                catalog_dict.set("AcroForm", Object::Dictionary(acro_dict));
                self.add_object(catalog_ref, Object::Dictionary(catalog_dict));
            }
            _ => {
                let mut acro_dict = Dictionary::new();
                append_acroform_fields(&mut acro_dict, annot_id);
                let mut catalog_dict = catalog_dict.clone();
                catalog_dict.set("AcroForm", Object::Dictionary(acro_dict));
                self.add_object(catalog_ref, Object::Dictionary(catalog_dict));
            }
        }
        Ok(())
    }

    fn update_metadata(&mut self, meta_ref: ObjectId) -> Result<()> {
        let Some(meta_obj) = self.get_object(meta_ref, false) else {
            return Ok(());
        };
        let Ok(stream) = meta_obj.as_stream() else {
            return Ok(());
        };
        let stamp = chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
        let mut content = stream.content.clone();
        content = replace_tag_content(&content, "xmp:ModifyDate", &stamp);
        content = replace_tag_content(&content, "xmp:MetadataDate", &stamp);
        let mut new_stream = stream.clone();
        new_stream.set_content(content);
        self.add_object(meta_ref, Object::Stream(new_stream));
        Ok(())
    }

    fn update_info(&mut self, mod_date: &str) -> Result<()> {
        let info_ref = self
            .trailer
            .get(b"Info")
            .map_err(|_| Error::MissingInfo)?
            .as_reference()
            .map_err(|_| Error::MissingInfo)?;
        let info_obj = self.get_object(info_ref, false).ok_or(Error::MissingInfo)?;
        let mut info_dict = info_obj.as_dict().map_err(|_| Error::MissingInfo)?.clone();
        info_dict.set("ModDate", Object::string_literal(mod_date.to_string()));
        info_dict.set("Producer", Object::string_literal(self.config.producer.clone()));
        self.add_object(info_ref, Object::Dictionary(info_dict));
        Ok(())
    }
}

fn append_acroform_fields(acro_dict: &mut Dictionary, annot_id: ObjectId) {
    acro_dict.set("SigFlags", Object::Integer(3));
    let mut fields = match acro_dict.get(b"Fields") {
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    fields.push(Object::reference(annot_id));
    acro_dict.set("Fields", Object::array(fields));
}
