use partita_domain_layout::{paginate, LayoutError, PageGeometry, PagePlan};
use pretty_assertions::assert_eq;

// 190mm content width: a capture 190px wide scales 1:1, so expected heights
// stay exact in f64.
fn plan_for(width_px: u32, height_px: u32) -> PagePlan {
    paginate(width_px, height_px, &PageGeometry::A4_DEFAULT).unwrap()
}

#[test]
fn tall_image_spans_three_pages() {
    // 6000px at 1900px wide scales to 600mm against a 295mm content box.
    let plan = plan_for(1900, 6000);

    assert_eq!(plan.image_height, 600.0);
    assert_eq!(plan.pages.len(), 3);
    assert_eq!(plan.pages[0].visible_height, 295.0);
    assert_eq!(plan.pages[1].visible_height, 295.0);
    assert_eq!(plan.pages[2].visible_height, 10.0);
}

#[test]
fn short_image_fits_one_page() {
    let plan = plan_for(190, 100);

    assert_eq!(plan.pages.len(), 1);
    assert_eq!(plan.pages[0].visible_height, 100.0);
    assert_eq!(plan.pages[0].image_y, 10.0);
}

#[test]
fn exact_fit_emits_a_trailing_blank_page() {
    let plan = plan_for(190, 295);

    assert_eq!(plan.pages.len(), 2);
    assert_eq!(plan.pages[0].visible_height, 295.0);
    assert_eq!(plan.pages[1].visible_height, 0.0);
    assert_eq!(plan.pages[1].source_offset, 295.0);
}

#[test]
fn exact_multiple_emits_a_trailing_blank_page() {
    let plan = plan_for(190, 590);

    assert_eq!(plan.pages.len(), 3);
    assert_eq!(plan.pages[2].visible_height, 0.0);
}

#[test]
fn page_count_is_floor_of_height_ratio_plus_one() {
    for height_px in [1u32, 100, 294, 295, 296, 590, 600, 885, 1000, 2950] {
        let plan = plan_for(190, height_px);
        let expected = (plan.image_height / 295.0).floor() as usize + 1;
        assert_eq!(plan.pages.len(), expected, "height_px = {height_px}");
    }
}

#[test]
fn slices_reconstruct_the_image_without_gaps() {
    let plan = plan_for(190, 1000);

    let total: f64 = plan.pages.iter().map(|p| p.visible_height).sum();
    assert_eq!(total, plan.image_height);

    for pair in plan.pages.windows(2) {
        assert_eq!(pair[1].source_offset, pair[0].source_offset + 295.0);
    }
}

#[test]
fn placements_shift_the_image_up_one_page_at_a_time() {
    let plan = plan_for(1900, 6000);

    assert_eq!(plan.pages[0].image_y, 10.0);
    for page in &plan.pages[1..] {
        assert_eq!(page.image_y, -page.source_offset);
    }
}

#[test]
fn capture_is_scaled_to_content_width() {
    // 380px wide scales by 0.5: 1100px tall becomes 550mm.
    let plan = plan_for(380, 1100);

    assert_eq!(plan.image_width, 190.0);
    assert_eq!(plan.image_height, 550.0);
    assert_eq!(plan.pages.len(), 2);
}

#[test]
fn empty_capture_yields_one_blank_page() {
    let plan = plan_for(190, 0);

    assert_eq!(plan.pages.len(), 1);
    assert_eq!(plan.pages[0].visible_height, 0.0);
}

#[test]
fn zero_width_capture_is_rejected() {
    let err = paginate(0, 600, &PageGeometry::A4_DEFAULT).unwrap_err();
    assert!(matches!(err, LayoutError::EmptySurface));
}

#[test]
fn bad_geometry_is_rejected() {
    assert!(matches!(
        PageGeometry::new(0.0, 295.0, 10.0),
        Err(LayoutError::InvalidGeometry(_))
    ));
    assert!(matches!(
        PageGeometry::new(190.0, -1.0, 10.0),
        Err(LayoutError::InvalidGeometry(_))
    ));
    assert!(matches!(
        PageGeometry::new(190.0, f64::NAN, 10.0),
        Err(LayoutError::InvalidGeometry(_))
    ));

    let geometry = PageGeometry {
        content_width: 190.0,
        content_height: 0.0,
        start_offset: 10.0,
    };
    assert!(matches!(
        paginate(190, 600, &geometry),
        Err(LayoutError::InvalidGeometry(_))
    ));
}
