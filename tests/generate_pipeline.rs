use og_gen::{
    Canvas, FALLBACK_TITLE, MetadataUpdate, OgError, ProjectLayout, RenderSettings, build_card,
    extract_og_metadata, generate_og_image_with,
    layout::card::{KEY_BYLINE, KEY_DESCRIPTION},
    parse_front_matter,
    render::SvgRenderer,
    run_generate, update_front_matter,
};

fn project(slug: &str, src: &str) -> (tempfile::TempDir, ProjectLayout) {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    let doc = layout.document_path(slug);
    std::fs::create_dir_all(doc.parent().unwrap()).unwrap();
    std::fs::write(doc, src).unwrap();
    (dir, layout)
}

#[test]
fn titled_document_gets_image_and_web_path() {
    let src = "---\ntitle: Release notes\nexcerpt: What changed\ntags:\n  - rust\n  - release\n---\n\nimport X from './x'\n\n<X />\n";
    let (_dir, layout) = project("release", src);

    let report = run_generate(&layout, "release").unwrap();
    assert_eq!(report.image_path, layout.image_path("release"));
    assert_eq!(report.metadata, MetadataUpdate::Written);

    let img = image::open(&report.image_path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (1200, 630));
    // top-left corner is the gradient's start color
    let px = img.get_pixel(0, 0).0;
    assert!(px[0].abs_diff(0x1a) <= 2 && px[3] == 255, "{px:?}");

    let doc = parse_front_matter(&report.document_path).unwrap();
    assert_eq!(
        doc.get("ogImage").and_then(|v| v.as_str()),
        Some("/og/release.png")
    );
    assert_eq!(doc.body, "\nimport X from './x'\n\n<X />\n");
    let tags = doc.get("tags").and_then(|v| v.as_sequence()).unwrap();
    assert_eq!(tags.len(), 2);
}

#[test]
fn existing_og_image_is_kept_but_image_regenerates() {
    let src = "---\ntitle: Custom\nogImage: /custom.png\n---\nbody";
    let (_dir, layout) = project("custom", src);

    let report = run_generate(&layout, "custom").unwrap();
    assert_eq!(report.metadata, MetadataUpdate::Unchanged);
    assert_eq!(std::fs::read_to_string(&report.document_path).unwrap(), src);
    assert!(report.image_path.is_file());

    assert_eq!(
        update_front_matter(&report.document_path, "/og/other.png").unwrap(),
        MetadataUpdate::Unchanged
    );
}

#[test]
fn omitted_fields_leave_no_nodes() {
    let (_dir, layout) = project("bare", "---\ntitle: Bare\n---\n");
    let meta = extract_og_metadata(layout.document_path("bare")).unwrap();
    let tree = build_card(&meta);
    assert!(tree.find(KEY_DESCRIPTION).is_none());
    assert!(tree.find(KEY_BYLINE).is_none());
}

#[test]
fn untitled_document_renders_fallback_text() {
    let (dir, layout) = project("untitled", "just a body\n");
    let meta = extract_og_metadata(layout.document_path("untitled")).unwrap();
    assert_eq!(meta.title, FALLBACK_TITLE);

    let svg = SvgRenderer::new(Canvas::OPEN_GRAPH, None)
        .render_document(&build_card(&meta))
        .unwrap();
    assert!(svg.contains(FALLBACK_TITLE));

    let out = dir.path().join("nested/deeper/untitled.png");
    generate_og_image_with(
        layout.document_path("untitled"),
        &out,
        &RenderSettings::default(),
        None,
    )
    .unwrap();
    assert!(out.is_file());
}

#[test]
fn control_characters_in_fields_still_render() {
    let src = "---\ntitle: \"Bell\\a here\"\ndescription: \"tab\\tand\\x1bescape\"\n---\n";
    let (_dir, layout) = project("bell", src);
    let meta = extract_og_metadata(layout.document_path("bell")).unwrap();
    assert_eq!(meta.title, "Bell\u{7} here");

    let svg = SvgRenderer::new(Canvas::OPEN_GRAPH, None)
        .render_document(&build_card(&meta))
        .unwrap();
    assert!(svg.contains("Bell here"), "{svg}");
    assert!(!svg.contains('\u{7}') && !svg.contains('\u{1b}'));

    let report = run_generate(&layout, "bell").unwrap();
    assert_eq!(report.metadata, MetadataUpdate::Written);
    let img = image::open(&report.image_path).unwrap();
    assert_eq!((img.width(), img.height()), (1200, 630));
}

#[test]
fn missing_document_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    let err = run_generate(&layout, "nope").unwrap_err();
    assert!(matches!(err, OgError::NotFound { .. }));
    assert!(err.to_string().contains("nope.mdx"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
