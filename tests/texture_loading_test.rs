use std::{io::Cursor, path::PathBuf, sync::Arc, time::Duration};

use room_ngin::{
    data_structures::{furniture::FurnitureKind, scene::EntityId},
    resources::{
        procedural::{Checkerboard, TextureProvider},
        texture::TextureSource,
    },
};
use winit::keyboard::KeyCode;

use crate::common::test_utils::Harness;

mod common;

const TIMEOUT: Duration = Duration::from_secs(5);

fn procedural(kind: &str, size: u32) -> TextureSource {
    TextureSource::Procedural {
        provider: Arc::new(Checkerboard::default()),
        kind: kind.to_string(),
        width: size,
        height: size,
    }
}

/// Returns three bytes no matter the requested size.
struct Truncated;

impl TextureProvider for Truncated {
    fn generate(&self, _kind: &str, _width: u32, _height: u32) -> Vec<u8> {
        vec![0; 3]
    }
}

fn add_chair(harness: &mut Harness) -> EntityId {
    let id = harness
        .editor
        .add_furniture(&FurnitureKind::Chair.into())
        .unwrap();
    EntityId::Furniture(id)
}

#[test]
fn placeholder_shows_until_the_load_lands() {
    let mut harness = Harness::new();
    let chair = add_chair(&mut harness);
    let placeholder = harness.editor.placeholder();

    harness
        .editor
        .request_texture(&chair, procedural("wood", 16))
        .unwrap();
    assert_eq!(harness.editor.scene().texture_of(&chair), Some(placeholder));
    assert_eq!(
        harness.editor.resources().texture_ref_count(placeholder),
        Some(2)
    );

    assert_eq!(harness.wait_for_textures(TIMEOUT), 1);
    let texture = harness.editor.scene().texture_of(&chair).unwrap();
    assert_ne!(texture, placeholder);
    let uploaded = harness.editor.resources().texture(texture).unwrap();
    assert_eq!((uploaded.width, uploaded.height), (16, 16));
    assert_eq!(
        harness.editor.resources().texture_ref_count(placeholder),
        Some(1)
    );
    assert!(harness.editor.take_notices().is_empty());
}

#[test]
fn load_for_removed_furniture_is_discarded() {
    let mut harness = Harness::new();
    let chair = add_chair(&mut harness);
    harness
        .editor
        .request_texture(&chair, procedural("tiles", 64))
        .unwrap();

    let EntityId::Furniture(id) = &chair else {
        unreachable!()
    };
    harness.editor.remove_furniture(id).unwrap();
    assert_eq!(harness.editor.pending_textures(), 0);

    // give the task time to finish and make sure nothing is applied
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(harness.editor.poll_textures(), 0);
    assert_eq!(harness.editor.resources().live_textures(), 1);
    assert!(harness.editor.take_notices().is_empty());
}

#[test]
fn only_the_latest_request_is_applied() {
    let mut harness = Harness::new();
    harness
        .editor
        .request_texture(&EntityId::Floor, procedural("wood", 32))
        .unwrap();
    let second = harness
        .editor
        .request_texture(&EntityId::Floor, procedural("tiles", 32))
        .unwrap();
    assert!(second > 1);
    assert_eq!(harness.editor.pending_textures(), 1);

    assert_eq!(harness.wait_for_textures(TIMEOUT), 1);
    // the superseded load may still be in flight; it must never land
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(harness.editor.poll_textures(), 0);

    let texture = harness.editor.scene().texture_of(&EntityId::Floor).unwrap();
    let uploaded = harness.editor.resources().texture(texture).unwrap();
    assert_eq!(uploaded.label, "procedural:tiles@32x32");
    // placeholder plus the floor texture
    assert_eq!(harness.editor.resources().live_textures(), 2);
}

#[test]
fn malformed_pixels_keep_the_placeholder() {
    let mut harness = Harness::new();
    let chair = add_chair(&mut harness);
    let source = TextureSource::Procedural {
        provider: Arc::new(Truncated),
        kind: "broken".to_string(),
        width: 8,
        height: 8,
    };
    harness.editor.request_texture(&chair, source).unwrap();

    assert_eq!(harness.wait_for_textures(TIMEOUT), 0);
    assert_eq!(harness.editor.pending_textures(), 0);
    assert_eq!(
        harness.editor.scene().texture_of(&chair),
        Some(harness.editor.placeholder())
    );
    let notices = harness.editor.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("procedural:broken@8x8"), "{notices:?}");
}

#[test]
fn missing_file_is_reported() {
    let mut harness = Harness::new();
    let path = PathBuf::from("does/not/exist/oak.png");
    harness
        .editor
        .request_texture(&EntityId::Floor, TextureSource::File(path))
        .unwrap();

    assert_eq!(harness.wait_for_textures(TIMEOUT), 0);
    let notices = harness.editor.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("oak.png"), "{notices:?}");
    assert_eq!(
        harness.editor.scene().texture_of(&EntityId::Floor),
        Some(harness.editor.placeholder())
    );
}

#[test]
fn encoded_png_bytes_are_decoded() {
    let mut png = Vec::new();
    image::RgbaImage::from_pixel(4, 2, image::Rgba([200, 10, 10, 255]))
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let mut harness = Harness::new();
    let source = TextureSource::Bytes {
        name: "red.png".to_string(),
        bytes: png,
    };
    harness
        .editor
        .request_texture(&EntityId::Floor, source)
        .unwrap();
    assert_eq!(harness.wait_for_textures(TIMEOUT), 1);

    let texture = harness.editor.scene().texture_of(&EntityId::Floor).unwrap();
    let uploaded = harness.editor.resources().texture(texture).unwrap();
    assert_eq!((uploaded.width, uploaded.height), (4, 2));
    assert_eq!(uploaded.bytes, 4 * 2 * 4);
}

#[test]
fn texture_key_cycles_procedural_patterns() {
    let mut harness = Harness::new();
    harness.editor.select(Some(EntityId::Floor)).unwrap();

    assert!(harness.editor.on_key_down(KeyCode::KeyT));
    assert_eq!(harness.wait_for_textures(TIMEOUT), 1);
    let first = harness.editor.scene().texture_of(&EntityId::Floor).unwrap();
    assert_eq!(
        harness.editor.resources().texture(first).unwrap().label,
        "procedural:wood@256x256"
    );

    assert!(harness.editor.on_key_down(KeyCode::KeyT));
    assert_eq!(harness.wait_for_textures(TIMEOUT), 1);
    let second = harness.editor.scene().texture_of(&EntityId::Floor).unwrap();
    assert_eq!(
        harness.editor.resources().texture(second).unwrap().label,
        "procedural:tiles@256x256"
    );
    // the first pattern was released when the second replaced it
    assert!(!harness.editor.resources().is_live(first));
}

#[test]
fn unknown_entity_cannot_request_a_texture() {
    let mut harness = Harness::new();
    let chair = add_chair(&mut harness);
    let EntityId::Furniture(id) = &chair else {
        unreachable!()
    };
    harness.editor.remove_furniture(id).unwrap();
    assert!(
        harness
            .editor
            .request_texture(&chair, procedural("wood", 8))
            .is_err()
    );
    assert_eq!(
        harness
            .editor
            .resources()
            .texture_ref_count(harness.editor.placeholder()),
        Some(1)
    );
}
