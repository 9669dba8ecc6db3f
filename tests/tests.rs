use resdir::{constants::*, *};
use std::{fs, sync::Once};

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};

static INIT_LOGGER: Once = Once::new();
fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::builder()
            .is_test(false)
            .filter_level(log::LevelFilter::Info)
            .format_timestamp(None)
            .format_module_path(false)
            .format_level(true)
            .format_target(false)
            .write_style(env_logger::WriteStyle::Auto)
            .init();
    });
}

fn image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255])))
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    image(width, height)
        .write_to(&mut std::io::Cursor::new(&mut data), ImageFormat::Png)
        .unwrap();
    data
}

/// Bitmap info header with the given bit count and number of colors, zero-padded to `len` bytes.
fn dib(bit_count: u16, clr_used: u32, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    data[0x00..0x04].copy_from_slice(&40u32.to_le_bytes());
    data[0x04..0x08].copy_from_slice(&1i32.to_le_bytes());
    data[0x08..0x0C].copy_from_slice(&1i32.to_le_bytes());
    data[0x0C..0x0E].copy_from_slice(&1u16.to_le_bytes());
    data[0x0E..0x10].copy_from_slice(&bit_count.to_le_bytes());
    data[0x20..0x24].copy_from_slice(&clr_used.to_le_bytes());
    data
}

fn version_info() -> VersionInfo {
    let mut info = VersionInfo::default();
    info.fixed.file_version = "1.2.3.4".into();
    info.fixed.product_version = "5.6.7.8".into();
    info.fixed.flags = "Prerelease,PrivateBuild".into();
    let strings = info.info.entry("0409".into()).or_default();
    strings.insert("CompanyName".into(), "Acme".into());
    strings.insert("ProductName".into(), "Thing".into());
    strings.insert("Comments".into(), "".into());
    info
}

fn app_manifest() -> AppManifest {
    AppManifest {
        identity: AssemblyIdentity {
            name:    "Acme.Thing".into(),
            version: "1.2.3.4".into(),
        },
        description: "A <thing> & \"more\"".into(),
        minimum_os: MinimumOs::Win7,
        execution_level: ExecutionLevel::AsInvoker,
        dpi_awareness: DpiAwareness::PerMonitorV2,
        long_path_aware: true,
        segment_heap: true,
        use_common_controls_v6: true,
        ..Default::default()
    }
}

#[test]
fn parse_identifiers() {
    init_logger();

    assert!(from_strings("RT_ICON", "RT_ICON", "RT_ICON").is_err(), "mnemonic is not a language");
    assert!(from_strings("RT_ICON", "#1", "#1").is_err(), "numeric id is not a language");
    assert_eq!(
        from_strings("#1", "#1", "040C").unwrap(),
        (ResourceType::Cursor, Identifier::ID(1), 0x040C),
        "standard numeric type is normalized"
    );
    assert_eq!(
        from_strings("#24", "Hello", "FFFF").unwrap(),
        (ResourceType::Manifest, Identifier::Name("Hello".into()), 0xFFFF)
    );
    assert_eq!(
        from_strings("#24", "Hello", "1FFFF"),
        Err(IdentifierError::InvalidLanguage("1FFFF".into())),
        "language outside 16 bits is rejected"
    );
    assert!(from_strings("é", "é", "é").is_err(), "non-hex language is rejected");
    assert_eq!(
        from_strings("é", "é", "0").unwrap(),
        (ResourceType::Name("é".into()), Identifier::Name("é".into()), 0)
    );
    assert_eq!(from_strings("", "#1", "0"), Err(IdentifierError::InvalidType));
    assert_eq!(from_strings("RT_ICON", "", "0"), Err(IdentifierError::InvalidId));
    assert_eq!(
        from_strings("\0", "\0", "0").unwrap(),
        (ResourceType::Name("\0".into()), Identifier::Name("\0".into()), 0),
        "control characters are accepted in names"
    );

    assert_eq!(Identifier::parse("##1"), Some(Identifier::Name("##1".into())));
    assert_eq!(Identifier::parse("1"), Some(Identifier::Name("1".into())));
    assert_eq!(Identifier::parse("#abc"), Some(Identifier::Name("#abc".into())));
    assert_eq!(Identifier::parse("#-1"), Some(Identifier::ID(0xFFFF)), "ids are signed 16-bit values");
    assert_eq!(Identifier::parse("#32768"), Some(Identifier::Name("#32768".into())));
    assert_eq!(Identifier::parse(""), None);
    assert_eq!(ResourceType::from_id(0x42), ResourceType::ID(0x42));
    assert_eq!(ResourceType::GroupIcon.id(), Some(RT_GROUP_ICON));
}

#[test]
fn format_identifiers() {
    init_logger();

    assert_eq!(
        to_strings(&ResourceType::ID(42), &Identifier::Name("Hey".into()), 0x0409),
        ("#42".to_string(), "Hey".to_string(), "0409".to_string())
    );
    assert_eq!(
        to_strings(&ResourceType::RcData, &Identifier::ID(7), 0),
        ("RT_RCDATA".to_string(), "#7".to_string(), "0000".to_string())
    );

    for id in [0u16, 1, 42, 32767] {
        let key = ResourceKey::new(ResourceType::Manifest, id, 0x040C);
        let (t, r, l) = key.to_strings();
        assert_eq!(ResourceKey::from_strings(&t, &r, &l).unwrap(), key, "numeric key round trip");
    }
    for name in ["Hey", "##1", "#abc", "APPICON"] {
        let key = ResourceKey::new(ResourceType::Name("CUSTOM".into()), name, 0x0409);
        let (t, r, l) = key.to_strings();
        assert_eq!(ResourceKey::from_strings(&t, &r, &l).unwrap(), key, "named key round trip");
    }

    let key = ResourceKey::new(ResourceType::Manifest, 1u16, 0);
    assert_eq!(key.to_string(), "[RT_MANIFEST][#1][0000]");
}

#[test]
fn export_names() {
    init_logger();

    let png = png(2, 2);
    let hey = Identifier::Name("Hey".into());
    let id1 = Identifier::ID(1);
    let id42 = Identifier::ID(42);

    let name = |first, data: &[u8], type_: ResourceType, id: &Identifier, lang| {
        exported_name(first, data, &type_, id, lang)
    };

    assert_eq!(name(true, b"", ResourceType::Name("PNG".into()), &id1, 0x0409), "PNG_#1_0409.bin");
    assert_eq!(name(true, &png, ResourceType::Name("PNG".into()), &id1, 0x0409), "PNG_#1_0409.png");
    assert_eq!(name(true, b"", ResourceType::Manifest, &id1, 0), "app.manifest");
    assert_eq!(name(false, b"", ResourceType::Manifest, &id1, 0x040C), "#1_040C.manifest");
    assert_eq!(name(true, b"", ResourceType::Version, &hey, 0x0409), "info.json");
    assert_eq!(name(false, b"", ResourceType::Version, &hey, 0x0409), "info_Hey_0409.json");
    assert_eq!(name(false, &png, ResourceType::RcData, &hey, 0x0409), "RT_RCDATA_Hey_0409.png");
    assert_eq!(
        name(false, b"\x89PNG\r\n\x1a\nnot a png", ResourceType::RcData, &hey, 0x0409),
        "RT_RCDATA_Hey_0409.bin",
        "png signature alone is not enough"
    );
    assert_eq!(name(false, &png[..8], ResourceType::RcData, &hey, 0x0409), "RT_RCDATA_Hey_0409.bin");
    assert_eq!(name(true, b"", ResourceType::ID(42), &hey, 0x0409), "#42_Hey_0409.bin");
    assert_eq!(name(true, &png, ResourceType::Bitmap, &hey, 0x0409), "Hey_0409.bmp");
    assert_eq!(name(true, &png, ResourceType::AniIcon, &id42, 0x0409), "RT_ANIICON_#42_0409.ani");
    assert_eq!(name(true, b"", ResourceType::AniCursor, &id42, 0x0409), "RT_ANICURSOR_#42_0409.ani");
    assert_eq!(name(true, b"", ResourceType::GroupCursor, &id42, 0x0401), "#42_0401.cur");
    assert_eq!(
        name(true, b"", ResourceType::GroupIcon, &Identifier::Name("APPICON".into()), 0x0402),
        "APPICON_0402.ico"
    );
}

#[test]
fn reconstruct_bitmap() {
    init_logger();

    let cases = [
        (1, 1, 0x30, 0x3A),
        (1, 0, 0x34, 0x3E),
        (4, 5, 0x7C, 0x4A),
        (4, 0, 0xA8, 0x76),
        (8, 25, 0xB4, 0x9A),
        (8, 0, 0x450, 0x436),
        (16, 0, 0x64, 0x36),
        (24, 0, 0x78, 0x36),
        (32, 0, 0x96, 0x36),
    ];
    for (bit_count, clr_used, len, offset) in cases {
        let data = dib(bit_count, clr_used, len);
        let bmp = dib_to_bmp(&data);
        assert_eq!(bmp.len(), len + 14, "{}bpp-{} file size", bit_count, clr_used);
        assert_eq!(&bmp[0..2], b"BM");
        assert_eq!(
            u32::from_le_bytes(bmp[2..6].try_into().unwrap()) as usize,
            len + 14,
            "{}bpp-{} header size",
            bit_count,
            clr_used
        );
        assert_eq!(&bmp[6..10], &[0, 0, 0, 0]);
        assert_eq!(
            u32::from_le_bytes(bmp[10..14].try_into().unwrap()),
            offset,
            "{}bpp-{} pixel data offset",
            bit_count,
            clr_used
        );
        assert_eq!(&bmp[14..], &data[..], "{}bpp-{} payload", bit_count, clr_used);
        assert_eq!(bmp_to_dib(&bmp), &data[..], "{}bpp-{} header stripped", bit_count, clr_used);
    }

    let unchanged = [
        dib(2, 0, 0x40),
        dib(8, 0, 0x40),
        {
            let mut data = dib(8, 0, 0x40);
            data[0] = 10;
            data
        },
        dib(1, 0, 0x30)[..15].to_vec(),
    ];
    for data in unchanged {
        assert_eq!(&dib_to_bmp(&data)[..], &data[..], "bitmap is unchanged");
    }
}

#[test]
fn strip_bitmap_header() {
    init_logger();

    let data = b"BM\x13\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00abcde";
    assert_eq!(bmp_to_dib(data), b"abcde");

    let wrong_size = b"BM\x14\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00abcde";
    assert_eq!(bmp_to_dib(wrong_size), &wrong_size[..], "size mismatch keeps the header");
    let wrong_magic = b"BN\x13\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00abcde";
    assert_eq!(bmp_to_dib(wrong_magic), &wrong_magic[..]);
    assert_eq!(bmp_to_dib(b"BM\x0e\x00\x00\x00"), b"BM\x0e\x00\x00\x00", "short data is kept");
}

#[test]
fn icon_containers() {
    init_logger();

    let icon = Icon::from_images(&[image(32, 32), image(256, 256), image(16, 24)]).unwrap();
    assert_eq!(icon.images.len(), 3);
    assert_eq!((icon.images[1].width, icon.images[1].height), (256, 256));
    assert_eq!((icon.images[2].width, icon.images[2].height), (16, 24));

    let ico = icon.to_ico();
    assert_eq!(&ico[0..6], &[0, 0, 1, 0, 3, 0], "ico header");
    assert_eq!(ico[6 + 16], 0, "256 pixel width is stored as 0");
    assert_eq!(Icon::from_ico(&ico).unwrap(), icon, "ico round trip");

    assert!(Icon::from_images(&[image(257, 16)]).is_err(), "images larger than 256 are rejected");
    assert!(Icon::from_images(&[]).is_err());
    assert!(Icon::from_ico(&ico[..20]).is_err(), "truncated ico is rejected");
    assert!(Icon::from_ico(&[0, 0, 2, 0, 0, 0]).is_err(), "cursor header is rejected");

    let resized = Icon::from_resized_image(&image(100, 100)).unwrap();
    let sizes = resized.images.iter().map(|image| image.width).collect::<Vec<_>>();
    assert_eq!(sizes, vec![64, 48, 32, 16], "images are never scaled up");
    let small = Icon::from_resized_image(&image(8, 8)).unwrap();
    assert_eq!(small.images.len(), 1);
    assert_eq!(small.images[0].width, 8);
}

#[test]
fn cursor_containers() {
    init_logger();

    let cursor = Cursor::from_images(&[
        (image(32, 32), HotSpot { x: 3, y: 4 }),
        (image(48, 48), HotSpot { x: 10, y: 20 }),
    ])
    .unwrap();
    let cur = cursor.to_cur();
    assert_eq!(&cur[0..6], &[0, 0, 2, 0, 2, 0], "cur header");
    assert_eq!(&cur[10..14], &[3, 0, 4, 0], "hotspot is stored in the entry");

    let loaded = Cursor::from_cur(&cur).unwrap();
    assert_eq!(loaded, cursor, "cur round trip");
    assert!(Cursor::from_cur(&Icon::from_images(&[image(16, 16)]).unwrap().to_ico()).is_err());
}

/// Version nodes of 8 bytes each, every one claiming the rest of the buffer as its length.
fn nested_version_nodes() -> Vec<u8> {
    let len = 65528usize;
    let mut data = Vec::with_capacity(len);
    for offset in (0..len).step_by(8) {
        data.extend_from_slice(&((len - offset) as u16).to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&[0, 0]);
    }
    data
}

#[test]
fn version_info_codec() {
    init_logger();

    let info = version_info();
    let data = info.to_bytes().unwrap();
    assert_eq!(data.len() % 4, 0, "version resource is aligned");
    assert_eq!(u16::from_le_bytes([data[0], data[1]]) as usize, data.len());
    assert_eq!(VersionInfo::from_bytes(&data).unwrap(), info, "version info round trip");

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["fixed"]["file_version"], "1.2.3.4");
    assert_eq!(json["info"]["0409"]["CompanyName"], "Acme");
    let decoded: VersionInfo = serde_json::from_value(json!({
        "fixed": { "file_version": "1.2" },
        "info": { "040c": { "ProductName": "Truc" } }
    }))
    .unwrap();
    let decoded = VersionInfo::from_bytes(&decoded.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.fixed.file_version, "1.2.0.0", "missing version parts are zero");
    assert_eq!(decoded.fixed.product_version, "0.0.0.0");
    assert_eq!(decoded.info["040C"]["ProductName"], "Truc");
    assert_eq!(decoded.language(), Some(0x040C));

    let mut invalid = version_info();
    invalid.fixed.file_version = "1.2.3.4.5".into();
    assert!(invalid.to_bytes().is_err(), "more than four version parts are rejected");
    let mut invalid = version_info();
    invalid.fixed.flags = "Shiny".into();
    assert!(invalid.to_bytes().is_err(), "unknown flags are rejected");
    assert!(VersionInfo::from_bytes(&data[..10]).is_err(), "truncated version info is rejected");
    assert!(VersionInfo::from_bytes(&nested_version_nodes()).is_err(), "deep nesting is rejected");

    let mut oversized = version_info();
    oversized.info["0409"].insert("Comments".into(), "x".repeat(40000));
    assert!(
        matches!(oversized.to_bytes(), Err(ResourceError::InvalidVersionInfo(_))),
        "version info larger than 64 KiB is rejected"
    );
}

#[test]
fn app_manifest_codec() {
    init_logger();

    let manifest = app_manifest();
    let xml = manifest.to_xml();
    let text = String::from_utf8(xml.clone()).unwrap();
    assert!(text.contains("requestedExecutionLevel level=\"asInvoker\""));
    assert!(!text.contains("e2011457-1546-43c5-a5fe-008deee3d3f0"), "vista is not supported");
    assert!(text.contains("35138b9a-5d96-4fbd-8e2d-a2440225f93a"), "win7 is supported");
    assert_eq!(AppManifest::from_xml(&xml).unwrap(), manifest, "manifest round trip");

    let default = AppManifest::default();
    assert_eq!(AppManifest::from_xml(&default.to_xml()).unwrap(), default);

    let json = serde_json::to_value(&manifest).unwrap();
    assert_eq!(json["minimum-os"], "win7");
    assert_eq!(json["execution-level"], "as invoker");
    assert_eq!(json["dpi-awareness"], "per monitor v2");
    assert_eq!(json["use-common-controls-v6"], true);
    let decoded: AppManifest =
        serde_json::from_value(json!({ "execution-level": "administrator", "ui-access": true })).unwrap();
    assert_eq!(decoded.execution_level, ExecutionLevel::Administrator);
    assert!(decoded.ui_access);
    assert_eq!(decoded.dpi_awareness, DpiAwareness::System, "absent fields default");

    let foreign = br#"<?xml version="1.0"?>
<!-- produced elsewhere -->
<asmv1:assembly xmlns:asmv1="urn:schemas-microsoft-com:asm.v1" manifestVersion="1.0">
  <asmv1:assemblyIdentity name="Foreign &amp; Co" version="2.0.0.0" type="win32"/>
  <dependency>
    <dependentAssembly>
      <assemblyIdentity type="win32" name="Microsoft.Windows.Common-Controls" version="6.0.0.0"/>
    </dependentAssembly>
  </dependency>
  <application xmlns="urn:schemas-microsoft-com:asm.v3">
    <windowsSettings>
      <dpiAware xmlns="http://schemas.microsoft.com/SMI/2005/WindowsSettings">true/pm</dpiAware>
      <longPathAware xmlns="http://schemas.microsoft.com/SMI/2016/WindowsSettings">TRUE</longPathAware>
    </windowsSettings>
  </application>
</asmv1:assembly>"#;
    let parsed = AppManifest::from_xml(foreign).unwrap();
    assert_eq!(parsed.identity.name, "Foreign & Co", "entities are decoded");
    assert_eq!(parsed.dpi_awareness, DpiAwareness::PerMonitor);
    assert!(parsed.long_path_aware);
    assert!(parsed.use_common_controls_v6);
    assert_eq!(parsed.execution_level, ExecutionLevel::None);

    assert!(AppManifest::from_xml(b"\xff\xfe").is_err(), "non-utf8 manifest is rejected");
    assert!(AppManifest::from_xml(b"<other/>").is_err(), "missing assembly is rejected");
    assert!(AppManifest::from_xml(b"<assembly><a></b></assembly>").is_err());
}

#[test]
fn resource_set_entries() {
    init_logger();

    let mut resources = ResourceSet::new();
    assert!(resources.is_empty());

    let key = ResourceKey::new(ResourceType::RcData, "Hey", 0x0409);
    resources.set(&key, vec![1, 2, 3]).unwrap();
    resources.set(&ResourceKey::new(ResourceType::RcData, 2u16, 0), vec![4]).unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources.get(&key), Some(&[1u8, 2, 3][..]));

    resources.set(&key, vec![5]).unwrap();
    assert_eq!(resources.len(), 2, "setting an existing key replaces it");
    assert_eq!(resources.get(&key), Some(&[5u8][..]));

    let mut keys = Vec::new();
    resources.walk(&mut |key, _| {
        keys.push(key.clone());
        true
    });
    assert_eq!(keys[0], key, "walk keeps insertion order");
    let mut visited = 0;
    resources.walk(&mut |_, _| {
        visited += 1;
        false
    });
    assert_eq!(visited, 1, "walk stops when the visitor returns false");

    assert!(matches!(
        resources.set(&ResourceKey::new(ResourceType::RcData, "", 0), vec![]),
        Err(ResourceError::InvalidName(_))
    ));
    assert!(matches!(
        resources.set(&ResourceKey::new(ResourceType::Name("A\0B".into()), 1u16, 0), vec![]),
        Err(ResourceError::InvalidName(_))
    ));

    assert_eq!(resources.remove(&key), Some(vec![5]));
    assert_eq!(resources.remove(&key), None);
    resources.remove(&ResourceKey::new(ResourceType::RcData, 2u16, 0));
    assert!(resources.is_empty(), "empty tables are removed");
}

#[test]
fn resource_set_icons() {
    init_logger();

    let mut resources = ResourceSet::new();
    let app = Identifier::Name("APPICON".into());
    let icon = Icon::from_images(&[image(16, 16), image(32, 32)]).unwrap();
    resources.set_icon(&app, 0x0409, &icon).unwrap();
    assert_eq!(resources.len(), 3, "group and two frames");
    assert!(resources.get(&ResourceKey::new(ResourceType::Icon, 1u16, 0x0409)).is_some());
    assert!(resources.get(&ResourceKey::new(ResourceType::Icon, 2u16, 0x0409)).is_some());
    assert_eq!(resources.get_icon(&app, 0x0409).unwrap(), icon, "icon round trip");

    let other = Icon::from_images(&[image(48, 48)]).unwrap();
    resources.set_icon(&Identifier::ID(2), 0, &other).unwrap();
    assert!(resources.get(&ResourceKey::new(ResourceType::Icon, 3u16, 0)).is_some(), "next free id");

    let replacement = Icon::from_images(&[image(64, 64)]).unwrap();
    resources.set_icon(&app, 0x0409, &replacement).unwrap();
    assert_eq!(resources.len(), 4, "frames of the replaced icon are removed");
    assert_eq!(resources.get_icon(&app, 0x0409).unwrap(), replacement);
    assert!(resources.get(&ResourceKey::new(ResourceType::Icon, 2u16, 0x0409)).is_none());

    assert!(matches!(
        resources.get_icon(&Identifier::ID(9), 0),
        Err(ResourceError::MissingResource(_))
    ));
    assert!(resources.set_icon(&app, 0, &Icon::default()).is_err(), "empty icons are rejected");
}

#[test]
fn resource_set_cursors() {
    init_logger();

    let mut resources = ResourceSet::new();
    let cursor = Cursor::from_images(&[(image(32, 32), HotSpot { x: 1, y: 2 })]).unwrap();
    resources.set_cursor(&Identifier::ID(1), 0x0409, &cursor).unwrap();

    let frame = resources.get(&ResourceKey::new(ResourceType::Cursor, 1u16, 0x0409)).unwrap();
    assert_eq!(&frame[0..4], &[1, 0, 2, 0], "frame starts with the hotspot");
    let group = resources.get(&ResourceKey::new(ResourceType::GroupCursor, 1u16, 0x0409)).unwrap();
    assert_eq!(&group[6..10], &[32, 0, 64, 0], "group height includes the mask");
    assert_eq!(resources.get_cursor(&Identifier::ID(1), 0x0409).unwrap(), cursor, "cursor round trip");

    // frames in another language are used as a fallback
    let frame = resources.remove(&ResourceKey::new(ResourceType::Cursor, 1u16, 0x0409)).unwrap();
    resources.set(&ResourceKey::new(ResourceType::Cursor, 1u16, 0), frame).unwrap();
    assert_eq!(resources.get_cursor(&Identifier::ID(1), 0x0409).unwrap(), cursor);

    resources.remove(&ResourceKey::new(ResourceType::Cursor, 1u16, 0));
    assert!(matches!(
        resources.get_cursor(&Identifier::ID(1), 0x0409),
        Err(ResourceError::MissingResource(_))
    ));
}

#[test]
fn resource_set_version_and_manifest() {
    init_logger();

    let mut resources = ResourceSet::new();
    assert_eq!(resources.get_version_info().unwrap(), None);
    assert_eq!(resources.get_manifest().unwrap(), None);

    resources.set(&ResourceKey::new(ResourceType::Version, 1u16, 0x0407), vec![0; 4]).unwrap();
    resources.set(&ResourceKey::new(ResourceType::Version, 2u16, 0), vec![0; 4]).unwrap();
    let info = version_info();
    resources.set_version_info(&info).unwrap();
    assert_eq!(resources.len(), 1, "version info replaces all version resources");
    assert!(resources.get(&ResourceKey::new(ResourceType::Version, 1u16, 0x0409)).is_some());
    assert_eq!(resources.get_version_info().unwrap(), Some(info));

    let manifest = app_manifest();
    resources.set_manifest(&manifest).unwrap();
    assert!(resources.get(&ResourceKey::new(ResourceType::Manifest, 1u16, 0)).is_some());
    assert_eq!(resources.get_manifest().unwrap(), Some(manifest));
}

fn populated_resources() -> ResourceSet {
    let mut resources = ResourceSet::new();
    resources
        .set_icon(
            &Identifier::Name("APPICON".into()),
            0x0409,
            &Icon::from_images(&[image(16, 16), image(32, 32)]).unwrap(),
        )
        .unwrap();
    resources
        .set_cursor(
            &Identifier::ID(1),
            0x0409,
            &Cursor::from_images(&[(image(32, 32), HotSpot { x: 5, y: 6 })]).unwrap(),
        )
        .unwrap();
    resources
        .set(&ResourceKey::new(ResourceType::Bitmap, "LOGO", 0x0409), dib(24, 0, 44))
        .unwrap();
    resources.set(&ResourceKey::new(ResourceType::RcData, "Hey", 0x0409), png(4, 4)).unwrap();
    resources
        .set(&ResourceKey::new(ResourceType::Name("CUSTOM".into()), 42u16, 0), b"custom".to_vec())
        .unwrap();
    resources.set_version_info(&version_info()).unwrap();
    resources.set_manifest(&app_manifest()).unwrap();
    resources
}

fn assert_equivalent(imported: &ResourceSet, original: &ResourceSet) {
    assert_eq!(imported.len(), original.len(), "imported entry count");
    for key in [
        ResourceKey::new(ResourceType::Bitmap, "LOGO", 0x0409),
        ResourceKey::new(ResourceType::RcData, "Hey", 0x0409),
        ResourceKey::new(ResourceType::Name("CUSTOM".into()), 42u16, 0),
    ] {
        assert_eq!(imported.get(&key), original.get(&key), "{} imported", key);
    }
    let app = Identifier::Name("APPICON".into());
    assert_eq!(imported.get_icon(&app, 0x0409).unwrap(), original.get_icon(&app, 0x0409).unwrap());
    assert_eq!(
        imported.get_cursor(&Identifier::ID(1), 0x0409).unwrap(),
        original.get_cursor(&Identifier::ID(1), 0x0409).unwrap()
    );
    assert_eq!(imported.get_version_info().unwrap(), original.get_version_info().unwrap());
    assert_eq!(imported.get_manifest().unwrap(), original.get_manifest().unwrap());
}

#[test]
fn export_import_directory() {
    init_logger();

    let dir = tempfile::tempdir().unwrap();
    let resources = populated_resources();

    let report = export_resources(dir.path(), &resources, &ExportOptions::default());
    assert_eq!(report.exported, 7);
    assert_eq!(report.skipped, 0);
    let manifest = report.manifest.unwrap();
    assert_eq!(manifest, dir.path().join("winres.json"));

    for file in [
        "APPICON_0409.ico",
        "#1_0409.cur",
        "LOGO_0409.bmp",
        "RT_RCDATA_Hey_0409.png",
        "CUSTOM_#42_0000.bin",
    ] {
        assert!(dir.path().join(file).is_file(), "{} exported", file);
    }
    assert!(!dir.path().join("app.manifest").exists(), "manifest is part of the document");
    let bmp = fs::read(dir.path().join("LOGO_0409.bmp")).unwrap();
    assert_eq!(&bmp[0..2], b"BM");

    let text = fs::read_to_string(&manifest).unwrap();
    assert!(text.starts_with("{\n  \""), "document is indented with two spaces");
    let document: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(document["RT_GROUP_ICON"]["APPICON"]["0409"], "APPICON_0409.ico");
    assert_eq!(document["RT_VERSION"]["#1"]["0409"]["fixed"]["file_version"], "1.2.3.4");
    assert_eq!(document["RT_MANIFEST"]["#1"]["0000"]["execution-level"], "as invoker");
    assert!(document.get("RT_ICON").is_none(), "icon frames are not exported");

    let mut imported = ResourceSet::new();
    import_resources(&mut imported, &manifest).unwrap();
    assert_equivalent(&imported, &resources);

    let again = tempfile::tempdir().unwrap();
    let report = export_resources(again.path(), &imported, &ExportOptions::default());
    assert_eq!(
        fs::read_to_string(report.manifest.unwrap()).unwrap(),
        text,
        "export is deterministic"
    );
}

#[test]
fn export_import_manifest_file() {
    init_logger();

    let dir = tempfile::tempdir().unwrap();
    let resources = populated_resources();
    let options = ExportOptions {
        manifest_in_document: false,
    };

    let report = export_resources(dir.path(), &resources, &options);
    let manifest = report.manifest.unwrap();
    let xml = fs::read(dir.path().join("app.manifest")).unwrap();
    assert_eq!(xml, app_manifest().to_xml());

    let document: Value = serde_json::from_slice(&fs::read(&manifest).unwrap()).unwrap();
    assert_eq!(document["RT_MANIFEST"]["#1"]["0000"], "app.manifest");

    let mut imported = ResourceSet::new();
    import_resources(&mut imported, &manifest).unwrap();
    assert_equivalent(&imported, &resources);
}

#[test]
fn export_skips_failed_entries() {
    init_logger();

    let dir = tempfile::tempdir().unwrap();
    let mut resources = ResourceSet::new();
    resources.set(&ResourceKey::new(ResourceType::GroupIcon, "BROKEN", 0), vec![1, 2, 3]).unwrap();
    resources.set(&ResourceKey::new(ResourceType::Version, 1u16, 0), vec![0; 8]).unwrap();
    resources.set(&ResourceKey::new(ResourceType::RcData, 1u16, 0), vec![1]).unwrap();

    let report = export_resources(dir.path(), &resources, &ExportOptions::default());
    assert_eq!(report.exported, 1);
    assert_eq!(report.skipped, 2);

    let document: Value =
        serde_json::from_slice(&fs::read(report.manifest.unwrap()).unwrap()).unwrap();
    assert_eq!(document, json!({ "RT_RCDATA": { "#1": { "0000": "RT_RCDATA_#1_0000.bin" } } }));
}

#[test]
fn export_skips_deeply_nested_version() {
    init_logger();

    let dir = tempfile::tempdir().unwrap();
    let mut resources = ResourceSet::new();
    resources.set(&ResourceKey::new(ResourceType::Version, 1u16, 0), nested_version_nodes()).unwrap();
    resources.set(&ResourceKey::new(ResourceType::RcData, 1u16, 0), vec![1]).unwrap();

    let report = export_resources(dir.path(), &resources, &ExportOptions::default());
    assert_eq!(report.exported, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.manifest.is_some());
}

#[test]
fn import_version_info_last_language_wins() {
    init_logger();

    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("winres.json");
    let text = serde_json::to_string(&json!({
        "RT_VERSION": { "#1": {
            "040C": { "fixed": { "file_version": "2.0.0.0" }, "info": { "040C": { "ProductName": "Truc" } } },
            "0409": { "fixed": { "file_version": "1.0.0.0" }, "info": { "0409": { "ProductName": "Thing" } } }
        } }
    }))
    .unwrap();
    assert!(text.find("040C").unwrap() < text.find("0409").unwrap());
    fs::write(&manifest, text).unwrap();

    let mut resources = ResourceSet::new();
    import_resources(&mut resources, &manifest).unwrap();
    assert_eq!(resources.len(), 1, "a single version resource remains");
    assert!(resources.get(&ResourceKey::new(ResourceType::Version, 1u16, 0x040C)).is_some());

    let info = resources.get_version_info().unwrap().unwrap();
    assert_eq!(info.fixed.file_version, "2.0.0.0", "the last language in sorted order wins");
    assert_eq!(info.info.keys().collect::<Vec<_>>(), vec!["040C"]);
    assert_eq!(info.info["040C"]["ProductName"], "Truc");
}

#[test]
fn import_errors() {
    init_logger();

    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("winres.json");
    fs::write(dir.path().join("a.bin"), b"a").unwrap();
    fs::write(dir.path().join("c.png"), png(16, 16)).unwrap();

    let import = |document: Value| {
        fs::write(&manifest, serde_json::to_vec(&document).unwrap()).unwrap();
        let mut resources = ResourceSet::new();
        let result = import_resources(&mut resources, &manifest);
        (result, resources)
    };

    let (result, _) = import(json!({ "RT_ICON": { "#1": { "0000": "a.bin" } } }));
    assert!(matches!(result, Err(ImportError::DirectFrame("RT_ICON", "RT_GROUP_ICON"))));
    let (result, _) = import(json!({ "RT_CURSOR": { "#1": { "0000": "a.bin" } } }));
    assert!(matches!(result, Err(ImportError::DirectFrame("RT_CURSOR", "RT_GROUP_CURSOR"))));

    for (field, definition) in [
        ("\"x\"", json!({ "y": 1, "image": "c.png" })),
        ("\"y\"", json!({ "x": 1, "image": "c.png" })),
        ("\"image\"", json!({ "x": 1, "y": 1 })),
        ("\"x\"", json!([{ "x": "1", "y": 1, "image": "c.png" }])),
        ("\"x\"", json!({ "x": -1, "y": 1, "image": "c.png" })),
        ("\"y\"", json!({ "x": 1, "y": 70000, "image": "c.png" })),
    ] {
        let (result, _) = import(json!({ "RT_GROUP_CURSOR": { "#1": { "0409": definition } } }));
        match result {
            Err(ImportError::InvalidCursor(message)) => {
                assert!(message.contains(field), "{} names {}", message, field)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
    let (result, resources) =
        import(json!({ "RT_GROUP_CURSOR": { "#1": { "0409": { "x": 1, "y": 2, "image": "c.png" } } } }));
    assert!(result.is_ok());
    assert_eq!(resources.get_cursor(&Identifier::ID(1), 0x0409).unwrap().images[0].hotspot, HotSpot {
        x: 1,
        y: 2
    });
    let (result, resources) =
        import(json!({ "RT_GROUP_CURSOR": { "#1": { "0409": [{ "x": 1.0, "y": 2.5, "image": "c.png" }] } } }));
    assert!(result.is_ok(), "fractional hotspots are accepted");
    assert_eq!(resources.get_cursor(&Identifier::ID(1), 0x0409).unwrap().images[0].hotspot, HotSpot {
        x: 1,
        y: 2
    });

    let (result, _) = import(json!({ "RT_GROUP_ICON": { "#1": { "0409": 1 } } }));
    assert!(matches!(result, Err(ImportError::InvalidIcon(_))));
    let (result, _) = import(json!({ "RT_RCDATA": { "#1": { "0409": 42 } } }));
    assert!(matches!(result, Err(ImportError::InvalidSet(_))));
    let (result, _) = import(json!({ "RT_RCDATA": { "#1": { "04G9": "a.bin" } } }));
    assert!(matches!(
        result,
        Err(ImportError::InvalidIdentifier(IdentifierError::InvalidLanguage(_)))
    ));
    let (result, _) = import(json!({ "RT_RCDATA": { "#1": { "0409": "missing.bin" } } }));
    assert!(matches!(result, Err(ImportError::IOError(_))));
    let (result, _) = import(json!({ "RT_VERSION": { "#1": { "0409": { "fixed": 3 } } } }));
    assert!(matches!(result, Err(ImportError::Json(_))));

    let (result, resources) = import(json!({
        "RT_RCDATA": { "#1": { "0409": "a.bin" }, "#2": { "0409": 1 } }
    }));
    assert!(result.is_err());
    assert_eq!(
        resources.get(&ResourceKey::new(ResourceType::RcData, 1u16, 0x0409)),
        Some(&b"a"[..]),
        "resources imported before the error are kept"
    );

    let mut resources = ResourceSet::new();
    assert!(matches!(
        import_resources(&mut resources, dir.path().join("absent.json")),
        Err(ImportError::IOError(_))
    ));
    fs::write(&manifest, b"{ not json").unwrap();
    assert!(matches!(import_resources(&mut resources, &manifest), Err(ImportError::Json(_))));
    assert!(resources.is_empty());
}

#[test]
fn import_icons_from_images() {
    init_logger();

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("big.png"), png(100, 100)).unwrap();
    fs::write(dir.path().join("a.png"), png(16, 16)).unwrap();
    fs::write(dir.path().join("b.png"), png(32, 32)).unwrap();
    fs::write(
        dir.path().join("icon.ICO"),
        Icon::from_images(&[image(24, 24)]).unwrap().to_ico(),
    )
    .unwrap();
    let manifest = dir.path().join("winres.json");
    fs::write(
        &manifest,
        serde_json::to_vec(&json!({
            "RT_GROUP_ICON": {
                "BIG": { "0000": "big.png" },
                "LIST": { "0000": ["a.png", "b.png"] },
                "ICO": { "0000": "icon.ICO" }
            }
        }))
        .unwrap(),
    )
    .unwrap();

    let mut resources = ResourceSet::new();
    import_resources(&mut resources, &manifest).unwrap();

    let big = resources.get_icon(&Identifier::Name("BIG".into()), 0).unwrap();
    assert_eq!(big.images.len(), 4, "single image is resized to the standard sizes");
    let list = resources.get_icon(&Identifier::Name("LIST".into()), 0).unwrap();
    let sizes = list.images.iter().map(|image| image.width).collect::<Vec<_>>();
    assert_eq!(sizes, vec![16, 32], "listed images keep their order and size");
    let ico = resources.get_icon(&Identifier::Name("ICO".into()), 0).unwrap();
    assert_eq!(ico.images[0].width, 24, "ico extension is case-insensitive");
}
