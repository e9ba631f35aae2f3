#[macro_use]
extern crate rocket;

#[launch]
fn rocket() -> _ {
    auth_server::init_logger();
    log::info!("starting auth server");
    auth_server::rocket()
}
