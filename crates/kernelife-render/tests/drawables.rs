use kernelife_core::{Kernel, KernelShape, Lattice, MetricSeries};
use kernelife_render::{
    Bounds, Color, Drawable, KernelPainter, LatticeView, PixelBuffer, SeriesGraph, render_all,
};

fn quad() -> Lattice {
    Lattice::from_cells(2, 2, vec![0.0, 1.0, 0.5, 0.25]).expect("lattice")
}

fn touched(buffer: &PixelBuffer) -> Vec<(i64, i64)> {
    let mut out = Vec::new();
    for y in 0..i64::from(buffer.height()) {
        for x in 0..i64::from(buffer.width()) {
            if buffer.get(x, y) != Some(Color::TRANSPARENT) {
                out.push((x, y));
            }
        }
    }
    out
}

#[test]
fn lattice_view_maps_cells_to_grayscale() {
    let lattice = quad();
    let mut buffer = PixelBuffer::new(4, 4);
    LatticeView::new(&lattice, Bounds::new(0, 0, 4, 4)).render_into(&mut buffer);
    assert_eq!(buffer.get(0, 0), Some(Color::BLACK));
    assert_eq!(buffer.get(1, 1), Some(Color::BLACK));
    assert_eq!(buffer.get(2, 0), Some(Color::WHITE));
    assert_eq!(buffer.get(0, 2), Some(Color::gray(0.5)));
    assert_eq!(buffer.get(3, 3), Some(Color([64, 64, 64, 255])));
}

#[test]
fn lattice_view_clips_to_buffer_and_bounds() {
    let lattice = quad();
    let mut buffer = PixelBuffer::new(4, 4);
    LatticeView::new(&lattice, Bounds::new(-2, -2, 4, 4)).render_into(&mut buffer);
    assert_eq!(buffer.get(0, 0), Some(Color([64, 64, 64, 255])));
    assert_eq!(buffer.get(1, 1), Some(Color([64, 64, 64, 255])));
    assert_eq!(touched(&buffer), vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
}

#[test]
fn lattice_view_letterboxes_wide_lattice() {
    let lattice = Lattice::new(4, 2, 1.0).expect("lattice");
    let mut buffer = PixelBuffer::new(8, 8);
    let view = LatticeView::new(&lattice, Bounds::new(0, 0, 8, 8));
    view.render_into(&mut buffer);
    assert_eq!(buffer.get(3, 1), Some(Color::BLACK));
    assert_eq!(buffer.get(3, 2), Some(Color::WHITE));
    assert_eq!(buffer.get(3, 5), Some(Color::WHITE));
    assert_eq!(buffer.get(3, 6), Some(Color::BLACK));
    let (nx, ny) = view
        .layout()
        .screen_to_normalized(6.0, 3.0)
        .expect("inside content");
    assert!((nx - 0.75).abs() < 1e-6 && (ny - 0.25).abs() < 1e-6);
    assert!(view.layout().screen_to_normalized(4.0, 0.5).is_none());
}

#[test]
fn series_graph_puts_newest_sample_on_the_right() {
    let mut series = MetricSeries::new(5);
    series.push(1.0);
    let mut buffer = PixelBuffer::new(7, 5);
    SeriesGraph::new(&series, Bounds::new(1, 1, 5, 3)).render_into(&mut buffer);
    assert_eq!(buffer.get(5, 1), Some(Color::WHITE), "newest at top right");
    assert_eq!(buffer.get(1, 3), Some(Color::WHITE), "oldest at bottom left");
    assert_eq!(buffer.get(5, 3), Some(Color::TRANSPARENT));
    assert!(
        touched(&buffer)
            .iter()
            .all(|&(x, y)| (1..6).contains(&x) && (1..4).contains(&y))
    );
}

#[test]
fn series_graph_respects_fixed_ceiling_and_clipping() {
    let mut series = MetricSeries::new(3);
    series.push(10.0);
    let mut buffer = PixelBuffer::new(4, 4);
    SeriesGraph::new(&series, Bounds::new(2, -3, 6, 6))
        .with_ceiling(20.0)
        .with_color(Color::rgb(255, 0, 0))
        .render_into(&mut buffer);
    // Only the part of the graph overlapping the buffer is drawn.
    assert!(touched(&buffer).iter().all(|&(x, _)| x >= 2));
    assert_eq!(buffer.get(2, 2), Some(Color::rgb(255, 0, 0)));
}

#[test]
fn kernel_painter_shades_relative_to_max() {
    let kernel = Kernel::from_shape(&KernelShape::Moore { size: 3 }).expect("kernel");
    let mut buffer = PixelBuffer::new(6, 6);
    let painter = KernelPainter::new(&kernel, Bounds::new(0, 0, 6, 6));
    painter.render_into(&mut buffer);
    assert_eq!(buffer.get(0, 0), Some(Color::WHITE));
    assert_eq!(buffer.get(2, 3), Some(Color::BLACK));
    assert_eq!(buffer.get(5, 5), Some(Color::WHITE));
    assert_eq!(painter.cell_at(2.5, 3.5), Some((1, 1)));
    assert_eq!(painter.cell_at(6.5, 0.0), None);
}

#[test]
fn render_all_skips_offscreen_drawables() {
    let lattice = quad();
    let kernel = Kernel::identity(1).expect("kernel");
    let mut buffer = PixelBuffer::new(4, 4);
    let offscreen = LatticeView::new(&lattice, Bounds::new(10, 10, 4, 4));
    let corner = KernelPainter::new(&kernel, Bounds::new(3, 3, 1, 1));
    render_all(&mut buffer, &[&offscreen, &corner]);
    assert_eq!(touched(&buffer), vec![(3, 3)]);
    assert_eq!(buffer.to_rgba_bytes().len(), 4 * 4 * 4);
}
