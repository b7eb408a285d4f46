//! WGSL compute shaders for the hierarchical force engine.
//!
//! One tick of the engine runs these passes in order:
//! 1. `WEIGH_BODIES_SHADER`: per-body mass (degree-weighted when hub
//!    dissuasion is on)
//! 2. `BOUND_BOX_SHADER`: per-workgroup min/max reduction over positions
//! 3. `BOUND_COMBINE_SHADER`: fold workgroup extrema into the root cell
//! 4. `CELL_KEYS_SHADER`: Morton key per body
//! 5. `SORT_STEP_SHADER`: bitonic compare-exchange stages over the keys
//! 6. `START_OFFSETS_SHADER`: first-body offset per occupied leaf
//! 7. `BUILD_TREE_SHADER`: atomic mass/centroid accumulation over ancestors
//! 8. `COMPUTE_SUMS_SHADER`: finalize centers of mass and child links
//! 9. `FORCES_SHADER`: Barnes-Hut traversal, acceleration per body
//! 10. `INTEGRATE_SHADER`: velocity/position update into the output buffer
//!
//! The tree is a complete quad-tree of fixed depth stored breadth-first:
//! node 0 is the root, level `l` starts at `(4^l - 1) / 3` and holds `4^l`
//! cells in row-major order. Empty cells carry zero mass and are skipped
//! during traversal.

/// Per-body mass weights. Degree-weighted when hub dissuasion is enabled,
/// uniform otherwise.
pub const WEIGH_BODIES_SHADER: &str = r#"
struct TreeParams {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

const FLAG_DISSUADE_HUBS: u32 = 4u;

@group(0) @binding(0) var<storage, read_write> weights: array<u32>;
@group(0) @binding(1) var<storage, read> degrees: array<u32>;
@group(0) @binding(2) var<uniform> params: TreeParams;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let idx = global_id.x;
    if (idx >= params.num_bodies) {
        return;
    }
    var weight = 1u;
    if ((params.flags & FLAG_DISSUADE_HUBS) != 0u && idx < arrayLength(&degrees)) {
        weight = degrees[idx] + 1u;
    }
    weights[idx] = weight;
}
"#;

/// Per-workgroup bounding-box reduction over body positions.
pub const BOUND_BOX_SHADER: &str = r#"
struct TreeParams {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

@group(0) @binding(0) var<storage, read> positions: array<f32>;
@group(0) @binding(1) var<storage, read_write> global_x_mins: array<f32>;
@group(0) @binding(2) var<storage, read_write> global_x_maxs: array<f32>;
@group(0) @binding(3) var<storage, read_write> global_y_mins: array<f32>;
@group(0) @binding(4) var<storage, read_write> global_y_maxs: array<f32>;
@group(0) @binding(5) var<uniform> params: TreeParams;

var<workgroup> local_min_x: array<f32, 256>;
var<workgroup> local_min_y: array<f32, 256>;
var<workgroup> local_max_x: array<f32, 256>;
var<workgroup> local_max_y: array<f32, 256>;

@compute @workgroup_size(256)
fn main(
    @builtin(global_invocation_id) global_id: vec3<u32>,
    @builtin(local_invocation_id) local_id: vec3<u32>,
    @builtin(workgroup_id) wg_id: vec3<u32>,
) {
    let idx = global_id.x;
    let lid = local_id.x;

    var min_x = 1e30;
    var min_y = 1e30;
    var max_x = -1e30;
    var max_y = -1e30;
    if (idx < params.num_bodies) {
        let x = positions[2u * idx];
        let y = positions[2u * idx + 1u];
        min_x = x;
        min_y = y;
        max_x = x;
        max_y = y;
    }

    local_min_x[lid] = min_x;
    local_min_y[lid] = min_y;
    local_max_x[lid] = max_x;
    local_max_y[lid] = max_y;
    workgroupBarrier();

    for (var stride = 128u; stride > 0u; stride >>= 1u) {
        if (lid < stride) {
            local_min_x[lid] = min(local_min_x[lid], local_min_x[lid + stride]);
            local_min_y[lid] = min(local_min_y[lid], local_min_y[lid + stride]);
            local_max_x[lid] = max(local_max_x[lid], local_max_x[lid + stride]);
            local_max_y[lid] = max(local_max_y[lid], local_max_y[lid + stride]);
        }
        workgroupBarrier();
    }

    if (lid == 0u) {
        global_x_mins[wg_id.x] = local_min_x[0];
        global_x_maxs[wg_id.x] = local_max_x[0];
        global_y_mins[wg_id.x] = local_min_y[0];
        global_y_maxs[wg_id.x] = local_max_y[0];
    }
}
"#;

/// Fold the per-workgroup extrema into the root cell span and radius.
/// Dispatched as a single workgroup; threads stride over the group arrays.
pub const BOUND_COMBINE_SHADER: &str = r#"
struct TreeParams {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

struct TreeBounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
    radius: f32,
    bottom: i32,
    max_depth: u32,
    blocked: u32,
}

fn level_offset(level: u32) -> u32 {
    return ((1u << (2u * level)) - 1u) / 3u;
}

@group(0) @binding(0) var<storage, read> global_x_mins: array<f32>;
@group(0) @binding(1) var<storage, read> global_x_maxs: array<f32>;
@group(0) @binding(2) var<storage, read> global_y_mins: array<f32>;
@group(0) @binding(3) var<storage, read> global_y_maxs: array<f32>;
@group(0) @binding(4) var<storage, read_write> state: TreeBounds;
@group(0) @binding(5) var<uniform> params: TreeParams;

var<workgroup> local_min_x: array<f32, 256>;
var<workgroup> local_min_y: array<f32, 256>;
var<workgroup> local_max_x: array<f32, 256>;
var<workgroup> local_max_y: array<f32, 256>;

@compute @workgroup_size(256)
fn main(@builtin(local_invocation_id) local_id: vec3<u32>) {
    let lid = local_id.x;

    var min_x = 1e30;
    var min_y = 1e30;
    var max_x = -1e30;
    var max_y = -1e30;
    for (var i = lid; i < params.num_groups; i += 256u) {
        min_x = min(min_x, global_x_mins[i]);
        min_y = min(min_y, global_y_mins[i]);
        max_x = max(max_x, global_x_maxs[i]);
        max_y = max(max_y, global_y_maxs[i]);
    }

    local_min_x[lid] = min_x;
    local_min_y[lid] = min_y;
    local_max_x[lid] = max_x;
    local_max_y[lid] = max_y;
    workgroupBarrier();

    for (var stride = 128u; stride > 0u; stride >>= 1u) {
        if (lid < stride) {
            local_min_x[lid] = min(local_min_x[lid], local_min_x[lid + stride]);
            local_min_y[lid] = min(local_min_y[lid], local_min_y[lid + stride]);
            local_max_x[lid] = max(local_max_x[lid], local_max_x[lid + stride]);
            local_max_y[lid] = max(local_max_y[lid], local_max_y[lid + stride]);
        }
        workgroupBarrier();
    }

    if (lid == 0u) {
        let span = max(local_max_x[0] - local_min_x[0], local_max_y[0] - local_min_y[0]);
        state.min_x = local_min_x[0];
        state.min_y = local_min_y[0];
        state.max_x = local_max_x[0];
        state.max_y = local_max_y[0];
        state.radius = 0.5 * span + 1e-3;
        state.bottom = i32(level_offset(params.max_depth));
        state.max_depth = params.max_depth;
        state.blocked = 0u;
    }
}
"#;

/// Morton key per body; sentinel keys fill the padded sort tail.
pub const CELL_KEYS_SHADER: &str = r#"
struct TreeParams {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

struct TreeBounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
    radius: f32,
    bottom: i32,
    max_depth: u32,
    blocked: u32,
}

struct Cell {
    key: u32,
    body: u32,
}

const SENTINEL_KEY: u32 = 0xFFFFFFFFu;

@group(0) @binding(0) var<storage, read> positions: array<f32>;
@group(0) @binding(1) var<storage, read_write> cells: array<Cell>;
@group(0) @binding(2) var<uniform> params: TreeParams;
@group(0) @binding(3) var<uniform> bounds: TreeBounds;

fn expand_bits(v: u32) -> u32 {
    var x = v & 0xFFFFu;
    x = (x | (x << 8u)) & 0x00FF00FFu;
    x = (x | (x << 4u)) & 0x0F0F0F0Fu;
    x = (x | (x << 2u)) & 0x33333333u;
    x = (x | (x << 1u)) & 0x55555555u;
    return x;
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let idx = global_id.x;
    if (idx >= params.padded_bodies) {
        return;
    }
    if (idx >= params.num_bodies) {
        cells[idx] = Cell(SENTINEL_KEY, SENTINEL_KEY);
        return;
    }

    let range = 2.0 * bounds.radius;
    let norm_x = (positions[2u * idx] - bounds.min_x) / range;
    let norm_y = (positions[2u * idx + 1u] - bounds.min_y) / range;

    let resolution = 1u << params.max_depth;
    let grid_x = min(u32(clamp(norm_x, 0.0, 1.0) * f32(resolution)), resolution - 1u);
    let grid_y = min(u32(clamp(norm_y, 0.0, 1.0) * f32(resolution)), resolution - 1u);

    cells[idx] = Cell(expand_bits(grid_x) | (expand_bits(grid_y) << 1u), idx);
}
"#;

/// One compare-exchange stage of a bitonic sort over the Morton keys.
/// The host dispatches every (k, j) stage with a dynamic uniform offset.
pub const SORT_STEP_SHADER: &str = r#"
struct Cell {
    key: u32,
    body: u32,
}

struct SortStage {
    k: u32,
    j: u32,
    padded_bodies: u32,
    _pad: u32,
}

@group(0) @binding(0) var<storage, read_write> cells: array<Cell>;
@group(0) @binding(1) var<uniform> stage: SortStage;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let i = global_id.x;
    if (i >= stage.padded_bodies) {
        return;
    }
    let partner = i ^ stage.j;
    if (partner <= i) {
        return;
    }
    let ascending = (i & stage.k) == 0u;
    let a = cells[i];
    let b = cells[partner];
    if ((a.key > b.key) == ascending) {
        cells[i] = b;
        cells[partner] = a;
    }
}
"#;

/// Record the first sorted-body offset of every occupied leaf cell.
pub const START_OFFSETS_SHADER: &str = r#"
struct TreeParams {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

struct Cell {
    key: u32,
    body: u32,
}

const SENTINEL_KEY: u32 = 0xFFFFFFFFu;

fn level_offset(level: u32) -> u32 {
    return ((1u << (2u * level)) - 1u) / 3u;
}

fn compact_bits(v: u32) -> u32 {
    var x = v & 0x55555555u;
    x = (x | (x >> 1u)) & 0x33333333u;
    x = (x | (x >> 2u)) & 0x0F0F0F0Fu;
    x = (x | (x >> 4u)) & 0x00FF00FFu;
    x = (x | (x >> 8u)) & 0x0000FFFFu;
    return x;
}

@group(0) @binding(0) var<storage, read> cells: array<Cell>;
@group(0) @binding(1) var<storage, read_write> start: array<u32>;
@group(0) @binding(2) var<uniform> params: TreeParams;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let i = global_id.x;
    if (i >= params.num_bodies) {
        return;
    }
    let key = cells[i].key;
    if (key == SENTINEL_KEY) {
        return;
    }
    if (i > 0u && cells[i - 1u].key == key) {
        return;
    }
    let side = 1u << params.max_depth;
    let grid_x = compact_bits(key);
    let grid_y = compact_bits(key >> 1u);
    start[level_offset(params.max_depth) + grid_y * side + grid_x] = i;
}
"#;

/// Accumulate weighted positions and masses into every ancestor of each body.
pub const BUILD_TREE_SHADER: &str = r#"
struct TreeParams {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

struct Cell {
    key: u32,
    body: u32,
}

const SENTINEL_KEY: u32 = 0xFFFFFFFFu;
const COM_SCALE: f32 = 1000.0;

fn level_offset(level: u32) -> u32 {
    return ((1u << (2u * level)) - 1u) / 3u;
}

fn compact_bits(v: u32) -> u32 {
    var x = v & 0x55555555u;
    x = (x | (x >> 1u)) & 0x33333333u;
    x = (x | (x >> 2u)) & 0x0F0F0F0Fu;
    x = (x | (x >> 4u)) & 0x00FF00FFu;
    x = (x | (x >> 8u)) & 0x0000FFFFu;
    return x;
}

@group(0) @binding(0) var<storage, read> cells: array<Cell>;
@group(0) @binding(1) var<storage, read> positions: array<f32>;
@group(0) @binding(2) var<storage, read> weights: array<u32>;
@group(0) @binding(3) var<storage, read_write> x_sums: array<atomic<i32>>;
@group(0) @binding(4) var<storage, read_write> y_sums: array<atomic<i32>>;
@group(0) @binding(5) var<storage, read_write> count: array<atomic<u32>>;
@group(0) @binding(6) var<uniform> params: TreeParams;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let i = global_id.x;
    if (i >= params.num_bodies) {
        return;
    }
    let cell = cells[i];
    if (cell.key == SENTINEL_KEY) {
        return;
    }
    let body = cell.body;
    let x = positions[2u * body];
    let y = positions[2u * body + 1u];
    let weight = weights[body];
    let wx = i32(x * COM_SCALE) * i32(weight);
    let wy = i32(y * COM_SCALE) * i32(weight);

    let grid_x = compact_bits(cell.key);
    let grid_y = compact_bits(cell.key >> 1u);
    for (var level = 0u; level <= params.max_depth; level++) {
        let shift = params.max_depth - level;
        let side = 1u << level;
        let node = level_offset(level) + (grid_y >> shift) * side + (grid_x >> shift);
        atomicAdd(&x_sums[node], wx);
        atomicAdd(&y_sums[node], wy);
        atomicAdd(&count[node], weight);
    }
}
"#;

/// Finalize centers of mass and child links from the accumulated sums.
pub const COMPUTE_SUMS_SHADER: &str = r#"
struct TreeParams {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

const COM_SCALE: f32 = 1000.0;

fn level_offset(level: u32) -> u32 {
    return ((1u << (2u * level)) - 1u) / 3u;
}

// Level of a breadth-first node index.
fn level_of(idx: u32) -> u32 {
    var remaining = idx;
    var level = 0u;
    var level_size = 1u;
    while (remaining >= level_size) {
        remaining -= level_size;
        level += 1u;
        level_size *= 4u;
    }
    return level;
}

@group(0) @binding(0) var<storage, read> x_sums: array<i32>;
@group(0) @binding(1) var<storage, read> y_sums: array<i32>;
@group(0) @binding(2) var<storage, read> count: array<u32>;
@group(0) @binding(3) var<storage, read_write> x_cords: array<f32>;
@group(0) @binding(4) var<storage, read_write> y_cords: array<f32>;
@group(0) @binding(5) var<storage, read_write> mass: array<f32>;
@group(0) @binding(6) var<storage, read_write> children: array<i32>;
@group(0) @binding(7) var<uniform> params: TreeParams;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let idx = global_id.x;
    if (idx >= params.num_nodes) {
        return;
    }

    let node_count = count[idx];
    var com_x = 0.0;
    var com_y = 0.0;
    if (node_count > 0u) {
        com_x = f32(x_sums[idx]) / (COM_SCALE * f32(node_count));
        com_y = f32(y_sums[idx]) / (COM_SCALE * f32(node_count));
    }
    x_cords[idx] = com_x;
    y_cords[idx] = com_y;
    mass[idx] = f32(node_count);

    let level = level_of(idx);
    let base = 4u * idx;
    if (level >= params.max_depth) {
        children[base] = -1;
        children[base + 1u] = -1;
        children[base + 2u] = -1;
        children[base + 3u] = -1;
        return;
    }

    let side = 1u << level;
    let in_level = idx - level_offset(level);
    let cell_x = in_level % side;
    let cell_y = in_level / side;
    let child_side = side * 2u;
    let child_base = level_offset(level + 1u) + (2u * cell_y) * child_side + 2u * cell_x;
    children[base] = i32(child_base);
    children[base + 1u] = i32(child_base + 1u);
    children[base + 2u] = i32(child_base + child_side);
    children[base + 3u] = i32(child_base + child_side + 1u);
}
"#;

/// Barnes-Hut force evaluation: iterative stack traversal per body,
/// processed in Morton order for memory locality.
pub const FORCES_SHADER: &str = r#"
struct TreeParams {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

struct TreeBounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
    radius: f32,
    bottom: i32,
    max_depth: u32,
    blocked: u32,
}

struct Cell {
    key: u32,
    body: u32,
}

const FLAG_PREVENT_OVERLAP: u32 = 1u;
const FLAG_STRONG_GRAVITY: u32 = 2u;
const RAND_POOL: u32 = 146u;

@group(0) @binding(0) var<storage, read> positions: array<f32>;
@group(0) @binding(1) var<storage, read> x_cords: array<f32>;
@group(0) @binding(2) var<storage, read> y_cords: array<f32>;
@group(0) @binding(3) var<storage, read> mass: array<f32>;
@group(0) @binding(4) var<storage, read> children: array<i32>;
@group(0) @binding(5) var<storage, read> cells: array<Cell>;
@group(0) @binding(6) var<storage, read> rand_values: array<f32>;
@group(0) @binding(7) var<storage, read_write> accel: array<vec2<f32>>;
@group(0) @binding(8) var<uniform> params: TreeParams;
@group(0) @binding(9) var<uniform> bounds: TreeBounds;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let i = global_id.x;
    if (i >= params.num_bodies) {
        return;
    }
    let body = cells[i].body;
    let px = positions[2u * body];
    let py = positions[2u * body + 1u];
    var force = vec2<f32>(0.0, 0.0);

    var stack_node: array<i32, 64>;
    var stack_width: array<f32, 64>;
    var stack_ptr = 0;
    if (params.num_nodes > 0u) {
        stack_node[0] = 0;
        stack_width[0] = 2.0 * bounds.radius;
        stack_ptr = 1;
    }

    while (stack_ptr > 0) {
        stack_ptr -= 1;
        let node = stack_node[stack_ptr];
        let width = stack_width[stack_ptr];
        if (node < 0 || u32(node) >= params.num_nodes) {
            continue;
        }
        let node_mass = mass[node];
        if (node_mass <= 0.0) {
            continue;
        }

        // Softened distance; a body's own leaf contributes zero force
        // because dx and dy vanish.
        let dx = px - x_cords[node];
        let dy = py - y_cords[node];
        let dist_sq = dx * dx + dy * dy + 0.01;
        let dist = sqrt(dist_sq);

        let is_leaf = children[4u * u32(node)] < 0;
        if (width / dist < params.theta || is_leaf) {
            var repulsion = params.repulsion;
            if ((params.flags & FLAG_PREVENT_OVERLAP) != 0u && is_leaf
                && dist < params.overlap_distance) {
                repulsion *= 100.0;
            }
            let mag = repulsion * node_mass / dist_sq;
            force += vec2<f32>(dx, dy) / dist * mag;
        } else {
            let base = 4u * u32(node);
            let half = width * 0.5;
            for (var c = 0u; c < 4u; c++) {
                if (children[base + c] >= 0 && stack_ptr < 63) {
                    stack_node[stack_ptr] = children[base + c];
                    stack_width[stack_ptr] = half;
                    stack_ptr += 1;
                }
            }
        }
    }

    // Stochastic nudge from the seed pool; breaks the symmetry of exactly
    // coincident bodies, which see zero radial repulsion.
    let slot = (2u * (body + params.step)) % RAND_POOL;
    let jitter = vec2<f32>(rand_values[slot] - 0.5, rand_values[(slot + 1u) % RAND_POOL] - 0.5);
    force += jitter * params.repulsion * 0.001;

    // Center gravity, constant-magnitude by default, linear in distance
    // under the strong variant.
    let origin_dist = sqrt(px * px + py * py + 1e-6);
    if ((params.flags & FLAG_STRONG_GRAVITY) != 0u) {
        force -= vec2<f32>(px, py) * params.gravity;
    } else {
        force -= vec2<f32>(px, py) / origin_dist * params.gravity;
    }

    accel[body] = force;
}
"#;

/// Velocity/position integration into the output positions buffer.
pub const INTEGRATE_SHADER: &str = r#"
struct TreeParams {
    num_bodies: u32,
    num_nodes: u32,
    max_depth: u32,
    padded_bodies: u32,
    num_groups: u32,
    step: u32,
    flags: u32,
    theta: f32,
    repulsion: f32,
    gravity: f32,
    overlap_distance: f32,
    dt: f32,
    damping: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

@group(0) @binding(0) var<storage, read> positions: array<f32>;
@group(0) @binding(1) var<storage, read> accel: array<vec2<f32>>;
@group(0) @binding(2) var<storage, read_write> velocities: array<f32>;
@group(0) @binding(3) var<storage, read_write> out_positions: array<f32>;
@group(0) @binding(4) var<uniform> params: TreeParams;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let idx = global_id.x;
    if (idx >= params.num_bodies) {
        return;
    }
    let acc = accel[idx];
    let vx = (velocities[2u * idx] + acc.x * params.dt) * params.damping;
    let vy = (velocities[2u * idx + 1u] + acc.y * params.dt) * params.damping;
    velocities[2u * idx] = vx;
    velocities[2u * idx + 1u] = vy;
    out_positions[2u * idx] = positions[2u * idx] + vx * params.dt;
    out_positions[2u * idx + 1u] = positions[2u * idx + 1u] + vy * params.dt;
}
"#;
