use std::{f64::consts::PI, path::Path};

use dataset::{Material, PartId, RenderError, Renderer, SampleParameters};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_line_segment_mut, draw_polygon_mut},
    point::Point,
};

use crate::geom::{self, BrickBox, Rotation, Vec3};

const BACKGROUND: Rgb<u8> = Rgb([200, 200, 204]);
const AMBIENT: f64 = 0.12;
// watts to a unitless irradiance scale
const EXPOSURE: f64 = 0.4;
// camera looks down the -Z axis
const VIEW: Vec3 = [0.0, 0.0, 1.0];

/// Orthographic, flat-shaded stand-in for a real scene host. Draws the part
/// as a 2x4 brick box, which is enough to check poses, lighting and labels.
pub struct PreviewRenderer {
    pub width: u32,
    pub height: u32,
    pub brick: BrickBox,
}

impl PreviewRenderer {
    pub fn new([width, height]: [u32; 2]) -> Self {
        Self {
            width,
            height,
            brick: BrickBox {
                half: [2.0, 1.0, 0.6],
            },
        }
    }

    pub fn draw(&self, params: &SampleParameters) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let rot = Rotation::from_euler_xyz(params.rotation_euler);
        let px_per_unit = 0.45 * self.width.min(self.height) as f64 / self.brick.bounding_radius();
        let (cx, cy) = (self.width as f64 / 2.0, self.height as f64 / 2.0);
        let project = |p: Vec3| {
            let q = rot.apply(p);
            Point::new(
                (cx + q[0] * px_per_unit).round() as i32,
                (cy - q[1] * px_per_unit).round() as i32,
            )
        };

        for face in self.brick.faces() {
            let normal = rot.apply(face.normal);
            if geom::dot(normal, VIEW) <= 1e-6 {
                continue;
            }
            let centre = face
                .corners
                .iter()
                .fold([0.0; 3], |acc, &c| geom::add(acc, geom::scale(rot.apply(c), 0.25)));
            let color = shade(normal, centre, params);

            let mut poly: Vec<Point<i32>> = face.corners.iter().map(|&c| project(c)).collect();
            poly.dedup();
            if poly.len() > 1 && poly.first() == poly.last() {
                poly.pop();
            }
            if poly.len() < 3 {
                continue;
            }
            draw_polygon_mut(&mut img, &poly, color);

            let edge = Rgb(color.0.map(|c| c / 2));
            for (a, b) in poly.iter().zip(poly.iter().cycle().skip(1)) {
                draw_line_segment_mut(
                    &mut img,
                    (a.x as f32, a.y as f32),
                    (b.x as f32, b.y as f32),
                    edge,
                );
            }
        }
        img
    }
}

/// Lambert diffuse plus a Blinn-Phong highlight per point light.
fn shade(normal: Vec3, at: Vec3, params: &SampleParameters) -> Rgb<u8> {
    let Material {
        diffuse_rgb,
        metallic,
        specular,
        roughness,
    } = params.material;
    let shininess = 2.0 + (1.0 - roughness) * 126.0;

    let mut diffuse = AMBIENT;
    let mut highlight = 0.0;
    for light in &params.lights {
        let to_light = geom::sub(light.position(), at);
        let dist2 = geom::dot(to_light, to_light).max(1e-6);
        let l = geom::normalize(to_light);
        let n_dot_l = geom::dot(normal, l);
        if n_dot_l <= 0.0 {
            continue;
        }
        let irradiance = EXPOSURE * light.strength_w as f64 / (4.0 * PI * dist2);
        diffuse += irradiance * n_dot_l;

        let h = geom::normalize(geom::add(l, VIEW));
        highlight += irradiance * specular * geom::dot(normal, h).max(0.0).powf(shininess);
    }

    let channel = |base: f64| {
        let spec_tint = metallic * base + (1.0 - metallic);
        let linear = base * diffuse * (1.0 - metallic) + highlight * spec_tint;
        (linear.clamp(0.0, 1.0).powf(1.0 / 2.2) * 255.0).round() as u8
    };
    Rgb(diffuse_rgb.map(channel))
}

impl Renderer for PreviewRenderer {
    fn render(
        &mut self,
        _part: &PartId,
        params: &SampleParameters,
        output: &Path,
    ) -> Result<(), RenderError> {
        self.draw(params)
            .save(output)
            .map_err(|err| RenderError::failed(format!("saving {}: {err}", output.display())))
    }
}
