//! Small in-memory PDFs for unit tests

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, encryption, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// `num_pages` US Letter pages, each with a line of text in font F1
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let sizes = vec![(612.0, 792.0); num_pages as usize];
    create_test_pdf_with_sizes(&sizes)
}

pub fn create_test_pdf_with_sizes(sizes: &[(f64, f64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = add_helvetica(&mut doc);

    let mut page_ids = Vec::new();
    for (i, (width, height)) in sizes.iter().enumerate() {
        let content_id = add_page_text(&mut doc, &format!("Page {}", i + 1));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(*width as f32), Object::Real(*height as f32)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        page_ids.push(page_id);
    }

    finish(doc, pages_id, page_ids, Dictionary::new())
}

/// Single page whose MediaBox and Resources live on the Pages node
pub fn create_test_pdf_inherited_media_box(width: f64, height: f64) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = add_helvetica(&mut doc);
    let content_id = add_page_text(&mut doc, "Inherited");
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let inherited = dictionary! {
        "MediaBox" => vec![0.into(), 0.into(), Object::Real(width as f32), Object::Real(height as f32)],
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
    };
    finish(doc, pages_id, vec![page_id], inherited)
}

fn add_helvetica(doc: &mut Document) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    })
}

fn add_page_text(doc: &mut Document, text: &str) -> ObjectId {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![100.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let data = content.encode().unwrap();
    doc.add_object(Stream::new(Dictionary::new(), data))
}

fn finish(
    mut doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    mut pages: Dictionary,
) -> Vec<u8> {
    pages.set("Type", "Pages");
    pages.set("Count", page_ids.len() as i64);
    pages.set(
        "Kids",
        page_ids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
    );
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Standard security handler padding string
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// One page encrypted with 40-bit RC4 (revision 2).
///
/// With `empty_user_password` the file opens without a password, like a
/// file restricted only by an owner password. Otherwise the stored user
/// password check fails for the empty password.
pub fn create_encrypted_test_pdf(empty_user_password: bool) -> Vec<u8> {
    let mut doc = Document::load_mem(&create_test_pdf(1)).unwrap();
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::String(vec![0x5A; 32], StringFormat::Hexadecimal),
        "P" => -4,
    });
    let file_id = Object::String(b"overlay-test-file".to_vec(), StringFormat::Hexadecimal);
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set("ID", vec![file_id.clone(), file_id]);

    let key = encryption::get_encryption_key(&doc, "", false).unwrap();
    for (&id, object) in doc.objects.iter_mut() {
        if id == encrypt_id {
            continue;
        }
        // RC4 is symmetric, so the decryption routine encrypts plaintext
        if let Object::Stream(stream) = object {
            let plain = Object::Stream(stream.clone());
            let cipher = encryption::decrypt_object(&key, id, &plain).unwrap();
            stream.set_content(cipher);
        }
    }

    let user = if empty_user_password {
        rc4(&key, &PASSWORD_PAD)
    } else {
        vec![0; 32]
    };
    doc.get_dictionary_mut(encrypt_id)
        .unwrap()
        .set("U", Object::String(user, StringFormat::Hexadecimal));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut state: Vec<u8> = (0..=255).collect();
    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }

    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[i as usize]);
            state.swap(i as usize, j as usize);
            byte ^ state[state[i as usize].wrapping_add(state[j as usize]) as usize]
        })
        .collect()
}
