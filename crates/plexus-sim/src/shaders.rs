//! WGSL compute shaders for spring relaxation and edge geometry.

/// Edge-driven spring correction over one work-item list.
///
/// Each thread owns one (start, length) run of edges and accumulates
/// positional corrections onto the run's source endpoints. The forwards and
/// backwards passes bind the same pipeline to their respective edge and
/// work-item buffers; the backwards list already carries reversed pairs.
pub const SPRING_SHADER: &str = r#"
struct SpringParams {
    num_work_items: u32,
    num_edges: u32,
    flags: u32,
    step: u32,
    strength: f32,
    distance: f32,
    _pad0: u32,
    _pad1: u32,
}

const FLAG_DISSUADE_HUBS: u32 = 4u;
const FLAG_LIN_LOG: u32 = 8u;

@group(0) @binding(0) var<storage, read> edges: array<u32>;
@group(0) @binding(1) var<storage, read> work_items: array<u32>;
@group(0) @binding(2) var<storage, read> degrees: array<u32>;
@group(0) @binding(3) var<storage, read> positions: array<f32>;
@group(0) @binding(4) var<storage, read_write> out_positions: array<f32>;
@group(0) @binding(5) var<uniform> params: SpringParams;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let item = global_id.x;
    if (item >= params.num_work_items) {
        return;
    }
    let first = work_items[2u * item];
    let length = work_items[2u * item + 1u];

    for (var e = first; e < first + length; e++) {
        let src = edges[2u * e];
        let dst = edges[2u * e + 1u];

        let sx = positions[2u * src];
        let sy = positions[2u * src + 1u];
        let dx = positions[2u * dst] - sx;
        let dy = positions[2u * dst + 1u] - sy;
        let dist = sqrt(dx * dx + dy * dy) + 1e-6;

        var delta = dist - params.distance;
        if ((params.flags & FLAG_LIN_LOG) != 0u) {
            delta = log(1.0 + dist) - log(1.0 + params.distance);
        }
        var correction = params.strength * delta;
        if ((params.flags & FLAG_DISSUADE_HUBS) != 0u) {
            correction /= f32(degrees[src] + 1u);
        }

        out_positions[2u * src] += dx / dist * correction;
        out_positions[2u * src + 1u] += dy / dist * correction;
    }
}
"#;

/// Rewrite the straight-edge render geometry from current point positions.
pub const EDGE_GEOMETRY_SHADER: &str = r#"
struct SpringParams {
    num_work_items: u32,
    num_edges: u32,
    flags: u32,
    step: u32,
    strength: f32,
    distance: f32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read> edges: array<u32>;
@group(0) @binding(1) var<storage, read> positions: array<f32>;
@group(0) @binding(2) var<storage, read_write> springs_pos: array<f32>;
@group(0) @binding(3) var<uniform> params: SpringParams;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let e = global_id.x;
    if (e >= params.num_edges) {
        return;
    }
    let src = edges[2u * e];
    let dst = edges[2u * e + 1u];
    springs_pos[4u * e] = positions[2u * src];
    springs_pos[4u * e + 1u] = positions[2u * src + 1u];
    springs_pos[4u * e + 2u] = positions[2u * dst];
    springs_pos[4u * e + 3u] = positions[2u * dst + 1u];
}
"#;

/// Spring-relax each edge's mid-point chain and emit the bundled render
/// geometry plus per-segment color interpolation coordinates.
///
/// Mid-point s of edge e lives at index `e * num_splits + s`; segment s of
/// edge e (of `num_splits + 1` segments) lives at `e * (num_splits + 1) + s`.
pub const MID_SPRINGS_SHADER: &str = r#"
struct MidParams {
    num_work_items: u32,
    num_edges: u32,
    num_splits: u32,
    step: u32,
    strength: f32,
    distance: f32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read> edges: array<u32>;
@group(0) @binding(1) var<storage, read> work_items: array<u32>;
@group(0) @binding(2) var<storage, read> positions: array<f32>;
@group(0) @binding(3) var<storage, read> mid_in: array<f32>;
@group(0) @binding(4) var<storage, read_write> mid_out: array<f32>;
@group(0) @binding(5) var<storage, read_write> mid_springs: array<f32>;
@group(0) @binding(6) var<storage, read_write> color_coords: array<f32>;
@group(0) @binding(7) var<uniform> params: MidParams;

fn spring_toward(p: vec2<f32>, anchor: vec2<f32>, strength: f32, rest: f32) -> vec2<f32> {
    let d = anchor - p;
    let len = max(length(d), 1e-6);
    return p + strength * d * (1.0 - rest / len);
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let item = global_id.x;
    if (item >= params.num_work_items) {
        return;
    }
    let first = work_items[2u * item];
    let length = work_items[2u * item + 1u];
    let segments = params.num_splits + 1u;

    for (var e = first; e < first + length; e++) {
        let src = edges[2u * e];
        let dst = edges[2u * e + 1u];
        let src_pos = vec2<f32>(positions[2u * src], positions[2u * src + 1u]);
        let dst_pos = vec2<f32>(positions[2u * dst], positions[2u * dst + 1u]);

        var prev = src_pos;
        for (var s = 0u; s < params.num_splits; s++) {
            let mid_idx = e * params.num_splits + s;
            var p = vec2<f32>(mid_in[2u * mid_idx], mid_in[2u * mid_idx + 1u]);

            var next = dst_pos;
            if (s + 1u < params.num_splits) {
                let n = mid_idx + 1u;
                next = vec2<f32>(mid_in[2u * n], mid_in[2u * n + 1u]);
            }

            p = spring_toward(p, prev, params.strength, params.distance);
            p = spring_toward(p, next, params.strength, params.distance);
            mid_out[2u * mid_idx] = p.x;
            mid_out[2u * mid_idx + 1u] = p.y;

            let seg = e * segments + s;
            mid_springs[4u * seg] = prev.x;
            mid_springs[4u * seg + 1u] = prev.y;
            mid_springs[4u * seg + 2u] = p.x;
            mid_springs[4u * seg + 3u] = p.y;
            color_coords[4u * seg] = f32(s) / f32(segments);
            color_coords[4u * seg + 1u] = 0.0;
            color_coords[4u * seg + 2u] = f32(s + 1u) / f32(segments);
            color_coords[4u * seg + 3u] = 0.0;

            prev = p;
        }

        // Closing segment into the target endpoint.
        let seg = e * segments + params.num_splits;
        mid_springs[4u * seg] = prev.x;
        mid_springs[4u * seg + 1u] = prev.y;
        mid_springs[4u * seg + 2u] = dst_pos.x;
        mid_springs[4u * seg + 3u] = dst_pos.y;
        color_coords[4u * seg] = f32(params.num_splits) / f32(segments);
        color_coords[4u * seg + 1u] = 0.0;
        color_coords[4u * seg + 2u] = 1.0;
        color_coords[4u * seg + 3u] = 0.0;
    }
}
"#;
