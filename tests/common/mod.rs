//! Shared helpers for the integration tests: a complete miniature scenario on disk.
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write a complete miniature model into `dir` and return the path to its config file.
///
/// The model has a two-link bidirectional road inside a 100x100 m service area, one rail
/// station just outside the polygon, one DRT vehicle and one person whose day is an intermodal
/// walk-drt-pt-walk trip.
pub fn write_model(dir: &Path) -> PathBuf {
    write_file(
        dir,
        "nodes.csv",
        "id,x,y\n\
         n1,10.0,10.0\n\
         n2,20.0,10.0\n",
    );
    write_file(
        dir,
        "links.csv",
        "id,from,to,length,modes\n\
         l1,n1,n2,100.0,car\n\
         l2,n2,n1,100.0,car\n",
    );
    write_file(
        dir,
        "transit_stops.csv",
        "id,x,y,attributes\n\
         s1,150.0,10.0,stopFilter=station_S/U/RE/RB\n\
         s2,5000.0,10.0,stopFilter=station_S/U/RE/RB\n",
    );
    write_file(dir, "persons.csv", "id,attributes\np1,canUseDrt=true\n");
    write_file(
        dir,
        "plans.csv",
        "person_id,element,act_type,x,y,end_time,mode,distance,travel_time,route\n\
         p1,activity,home,10.0,10.0,28800,,,,\n\
         p1,leg,,,,,walk,500.0,600.0,\n\
         p1,activity,drt interaction,,,,,,,\n\
         p1,leg,,,,,drt,3000.0,600.0,directRideTime=420;maxWaitTime=600\n\
         p1,activity,pt interaction,,,,,,,\n\
         p1,leg,,,,,pt,10000.0,1800.0,\n\
         p1,activity,pt interaction,,,,,,,\n\
         p1,leg,,,,,walk,200.0,300.0,\n\
         p1,activity,work,150.0,10.0,,,,,\n",
    );
    write_file(
        dir,
        "vehicles_drt.csv",
        "id,start_link,service_begin,service_end\nv1,l1,0.0,86400.0\n",
    );
    write_square_shapefile(&dir.join("service_area.shp"), 0.0, 100.0);

    write_file(
        dir,
        "config.toml",
        r#"
[controler]
output_directory = "output"
iterations = 1

[network]
nodes_file = "nodes.csv"
links_file = "links.csv"

[plans]
persons_file = "persons.csv"
plans_file = "plans.csv"

[transit]
stops_file = "transit_stops.csv"

[drt]
[[drt.modes]]
mode = "drt"
service_area_shapefile = "service_area.shp"
vehicles_file = "vehicles_drt.csv"
vehicle_capacity = 4

[dvrp]

[drt_fares]
[[drt_fares.fares]]
mode = "drt"
base_fare = 1.0
min_fare_per_trip = 4.0
distance_fare_per_m = 0.002

[pt_intermodal]
routing_modes = ["pt_w_drt"]

[raptor]
"#,
    )
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let file_path = dir.join(name);
    let mut file = File::create(&file_path).unwrap();
    write!(file, "{contents}").unwrap();

    file_path
}

fn write_square_shapefile(shapefile_path: &Path, min: f64, max: f64) {
    let ring = shapefile::PolygonRing::Outer(vec![
        shapefile::Point::new(min, min),
        shapefile::Point::new(min, max),
        shapefile::Point::new(max, max),
        shapefile::Point::new(max, min),
        shapefile::Point::new(min, min),
    ]);
    let polygon = shapefile::Polygon::with_rings(vec![ring]);

    let mut writer = shapefile::ShapeWriter::from_path(shapefile_path).unwrap();
    writer.write_shape(&polygon).unwrap();
}
