use criterion::{black_box, criterion_group, criterion_main, Criterion};
use espanda_core::StringInterner;
use espanda_parser::parse;

// A medium-size source mixing declarations, control flow and annotations.
const SOURCE: &str = r#"
interface Shape {
    area(): number;
    readonly name: string;
}

type Point = { x: number; y: number };
type Sides = 3 | 4 | 5;

class Polygon implements Shape {
    readonly name: string;
    private points: Point[];

    constructor(name: string, points: Point[]) {
        this.name = name;
        this.points = points;
    }

    area(): number {
        let sum = 0;
        for (let i = 0; i < this.points.length; i++) {
            const a = this.points[i];
            const b = this.points[(i + 1) % this.points.length];
            sum += a.x * b.y - b.x * a.y;
        }
        return Math.abs(sum) / 2;
    }

    *vertices() {
        for (const p of this.points) {
            yield p;
        }
    }
}

function largest<T extends Shape>(shapes: T[]): T | undefined {
    let best: T | undefined;
    outer: for (const shape of shapes) {
        switch (typeof shape.area) {
            case "function":
                break;
            default:
                continue outer;
        }
        if (!best || shape.area() > best.area()) {
            best = shape;
        }
    }
    return best;
}

async function load(ids: number[]): Promise<number> {
    let total = 0;
    try {
        for (const id of ids) {
            total += await Promise.resolve(id);
        }
    } catch (e) {
        total = -1;
    } finally {
        console.log(`loaded ${ids.length} items`);
    }
    return total;
}

const square = new Polygon("square", [{ x: 0, y: 0 }, { x: 1, y: 0 }, { x: 1, y: 1 }, { x: 0, y: 1 }]);
const scale = (k: number) => ({ x, y }: Point): Point => ({ x: x * k, y: y * k });
const [first, ...rest] = [1, 2, 3];
export default largest([square]);
"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_medium", |b| {
        b.iter(|| {
            let result = parse("bench.ts", black_box(SOURCE), StringInterner::new());
            black_box(result.ast.len());
        });
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
